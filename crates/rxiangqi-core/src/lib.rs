//! rxiangqi-core: シャンチー（中国象棋）エンジンの局面コア
//!
//! 9路×10段の盤面表現・指し手の適用と巻き戻し・合法性判定・静的駒交換
//! 評価（SEE）・反復（千日手・長将・長捉）の判定を提供する。探索・評価
//! 関数・置換表・指し手生成は外部コンポーネントであり、このクレートは
//! それらが必要とする局面操作だけを受け持つ。
//!
//! - `types`: 基本型（手番・升・駒・指し手・評価値）
//! - `bitboard`: 90升の128bitビットボードと利き計算
//! - `position`: `Position` / `StateInfo` と局面操作の本体
//! - `prefetch`: 置換表プリフェッチのトレイト境界

pub mod bitboard;
pub mod position;
pub mod prefetch;
pub mod types;

pub use bitboard::Bitboard;
pub use position::{
    FenError, NodeCounter, Position, StateInfo, START_FEN,
};
pub use prefetch::{NoPrefetch, TtPrefetch};
pub use types::{Color, File, Key, Move, Piece, PieceType, Rank, Square, Value};
