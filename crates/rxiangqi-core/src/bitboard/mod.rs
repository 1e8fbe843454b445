//! ビットボードモジュール
//!
//! 90升の盤面を128bitで表現し、ビット演算と利き計算を提供する。
//!
//! - `Bitboard`: 128bit盤面表現（bit番号 = 段×9+筋）
//! - 筋・段・九宮・河界・兵領域のマスク（`FILE_BB`, `RANK_BB`, `PALACE_BB`, `HALF_BB`, `PAWN_AREA_BB`）
//! - 近接駒の利きテーブル（帥・士・象・馬・兵、および逆引き）
//! - 遠方駒の利き計算（車・砲、`between_bb` / `line_bb` など）

mod core;
mod sliders;
mod tables;

pub use self::core::{Bitboard, BitboardIter};
pub use sliders::*;
pub use tables::*;
