//! 局面表現モジュール
//!
//! シャンチーの局面を表現し、手の実行・巻き戻しを行う。
//!
//! - `Position`: 局面本体（盤面配列・Bitboard・駒数・手番・手数）
//! - `StateInfo`: 局面状態（Zobristキー、王手情報、pin情報、捉、直前の手など）
//! - `do_move` / `undo_move` / `do_null_move`: 手の実行と巻き戻し
//!   （`StateInfo` を `Vec` のスタックとして管理）
//! - `legal` / `pseudo_legal` / `gives_check`: 指し手の検査
//! - `see_ge`: 静的駒交換評価
//! - `chased` / `is_repeated`: 捉の検出と反復（千日手・長将・長捉）の判定
//! - FEN形式の解析・出力
//!
//! 盤面配列・Bitboard・Zobristキーは `Position` のメソッドを通じて更新
//! されることを前提とし、常に互いに整合しているように保つ。

mod chase;
mod fen;
mod json_conversion;
mod pos;
mod see;
mod state;
mod zobrist;

pub use fen::{FenError, START_FEN};
pub use pos::{NodeCounter, Position};
pub use state::{Accumulator, DirtyPiece, StateInfo};
pub use zobrist::{zobrist_psq, zobrist_side};
