//! 局面状態（StateInfo）
//!
//! 1手ごとに積まれるスナップショット。`Position` が `Vec<StateInfo>` を
//! スタックとして保持し、`do_move` でpush、`undo_move` でpopする。
//! 先頭フィールド群は `do_move` で前状態からコピーされ、残りは指し手の
//! 適用時に再計算される。

use crate::bitboard::Bitboard;
use crate::types::{Color, Key, Move, Piece, PieceType, Square, Value};

/// 差分評価（NNUE等）へ渡す駒の増減記録
///
/// 1手で動く駒は最大2枚（動かした駒と取られた駒）。取られた駒は
/// `to` が `None` になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyPiece {
    /// 有効なエントリ数（0-2）
    pub dirty_num: usize,
    pub piece: [Piece; 2],
    pub from: [Option<Square>; 2],
    pub to: [Option<Square>; 2],
}

impl Default for DirtyPiece {
    fn default() -> DirtyPiece {
        DirtyPiece {
            dirty_num: 0,
            piece: [Piece::NONE; 2],
            from: [None; 2],
            to: [None; 2],
        }
    }
}

/// 差分評価アキュムレータの計算済みフラグ
///
/// 本クレートは評価を行わない。外部の評価器が遅延再計算の要否を
/// 判断するためのフラグだけを持つ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    pub computed: [bool; Color::NUM],
}

/// 局面状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInfo {
    // ---- do_move時に前状態からコピーされるフィールド ----
    /// 兵・帥以外の駒割り [Color]
    pub non_pawn_material: [Value; Color::NUM],
    /// 直前のヌルムーブからの手数（反復検出の走査範囲）
    pub plies_from_null: i32,

    // ---- 指し手適用時に再計算されるフィールド ----
    /// Zobristキー
    pub key: Key,
    /// 手番側の玉に王手をかけている駒
    pub checkers_bb: Bitboard,
    /// 玉への利きを遮っている駒 [玉の色]
    pub blockers_for_king: [Bitboard; Color::NUM],
    /// ピンしている駒 [ピンしている側の色]
    pub pinners: [Bitboard; Color::NUM],
    /// そこに動くと敵玉に王手となる升 [駒種]
    pub check_squares: [Bitboard; PieceType::NUM],
    /// 直前の手で当たり（捉）になっている相手駒の升
    pub chased: Bitboard,
    /// 直前の手で取られた駒
    pub captured_piece: Piece,
    /// この状態を生んだ指し手
    pub last_move: Move,

    // ---- 外部評価器用 ----
    pub accumulator: Accumulator,
    pub dirty_piece: DirtyPiece,
}

impl Default for StateInfo {
    fn default() -> StateInfo {
        StateInfo {
            non_pawn_material: [Value::ZERO; Color::NUM],
            plies_from_null: 0,
            key: 0,
            checkers_bb: Bitboard::EMPTY,
            blockers_for_king: [Bitboard::EMPTY; Color::NUM],
            pinners: [Bitboard::EMPTY; Color::NUM],
            check_squares: [Bitboard::EMPTY; PieceType::NUM],
            chased: Bitboard::EMPTY,
            captured_piece: Piece::NONE,
            last_move: Move::NONE,
            accumulator: Accumulator::default(),
            dirty_piece: DirtyPiece::default(),
        }
    }
}
