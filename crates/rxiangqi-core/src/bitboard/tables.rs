//! 近接駒の利きテーブルと盤面マスク
//!
//! 帥・士・象・馬・兵の利きは事前計算テーブルで求める。九宮・河界の
//! 制約はテーブル生成時に織り込み済み。馬と象は間の升（馬脚・象眼）が
//! 空いているときのみ利きが通るため、(遮り升, 利き先) の対で保持する。

use std::sync::OnceLock;

use crate::types::{Color, Square};

use super::Bitboard;

const fn file_bb(file: usize) -> u128 {
    let mut bb = 0u128;
    let mut rank = 0;
    while rank < 10 {
        bb |= 1u128 << (rank * 9 + file);
        rank += 1;
    }
    bb
}

const fn rank_bb(rank: usize) -> u128 {
    let mut bb = 0u128;
    let mut file = 0;
    while file < 9 {
        bb |= 1u128 << (rank * 9 + file);
        file += 1;
    }
    bb
}

const fn build_file_bb() -> [Bitboard; 9] {
    let mut t = [Bitboard::EMPTY; 9];
    let mut f = 0;
    while f < 9 {
        t[f] = Bitboard(file_bb(f));
        f += 1;
    }
    t
}

const fn build_rank_bb() -> [Bitboard; 10] {
    let mut t = [Bitboard::EMPTY; 10];
    let mut r = 0;
    while r < 10 {
        t[r] = Bitboard(rank_bb(r));
        r += 1;
    }
    t
}

/// 筋マスク
pub static FILE_BB: [Bitboard; 9] = build_file_bb();

/// 段マスク
pub static RANK_BB: [Bitboard; 10] = build_rank_bb();

const fn half_bb(color: usize) -> u128 {
    let mut bb = 0u128;
    let mut r = if color == 0 { 0 } else { 5 };
    let end = if color == 0 { 5 } else { 10 };
    while r < end {
        bb |= rank_bb(r);
        r += 1;
    }
    bb
}

/// 自陣側（河のこちら側）のマスク [Color]
pub static HALF_BB: [Bitboard; 2] = [Bitboard(half_bb(0)), Bitboard(half_bb(1))];

const fn palace_bb() -> u128 {
    let mut bb = 0u128;
    let mut r = 0;
    while r < 10 {
        if r <= 2 || r >= 7 {
            let mut f = 3;
            while f <= 5 {
                bb |= 1u128 << (r * 9 + f);
                f += 1;
            }
        }
        r += 1;
    }
    bb
}

/// 九宮マスク（両陣営）
pub static PALACE_BB: Bitboard = Bitboard(palace_bb());

const fn pawn_area_bb(color: usize) -> u128 {
    // 自陣側は初期配置の2段のみ、敵陣側は全升
    let start_ranks: [usize; 2] = if color == 0 { [3, 4] } else { [5, 6] };
    half_bb(1 - color) | rank_bb(start_ranks[0]) | rank_bb(start_ranks[1])
}

/// 兵が存在しうる升のマスク [Color]
pub static PAWN_AREA_BB: [Bitboard; 2] = [Bitboard(pawn_area_bb(0)), Bitboard(pawn_area_bb(1))];

fn in_bounds(file: i32, rank: i32) -> bool {
    (0..=8).contains(&file) && (0..=9).contains(&rank)
}

fn square_from_coords(file: i32, rank: i32) -> Square {
    debug_assert!(in_bounds(file, rank), "coordinates out of bounds");
    // SAFETY: 呼び出し元/上のassertで盤内を保証
    unsafe { Square::from_u8_unchecked((rank * 9 + file) as u8) }
}

struct StepTable {
    king_effect: [Bitboard; Square::NUM],
    advisor_effect: [Bitboard; Square::NUM],
    pawn_effect: [[Bitboard; Square::NUM]; Color::NUM],
    pawn_to_effect: [[Bitboard; Square::NUM]; Color::NUM],
    /// (馬脚, 利き先) の対
    knight_pairs: [Vec<(Square, Square)>; Square::NUM],
    /// 逆引き: (馬脚, 攻撃元候補) の対。馬脚は対象升の斜め隣。
    knight_to_pairs: [Vec<(Square, Square)>; Square::NUM],
    /// (象眼, 利き先) の対
    bishop_pairs: [Vec<(Square, Square)>; Square::NUM],
    knight_leg_mask: [Bitboard; Square::NUM],
    bishop_eye_mask: [Bitboard; Square::NUM],
}

static STEP_TABLE: OnceLock<StepTable> = OnceLock::new();

fn step_table() -> &'static StepTable {
    STEP_TABLE.get_or_init(StepTable::new)
}

const ORTHO_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAG_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_DIRS: [(i32, i32); 8] = [
    (1, 2),
    (-1, 2),
    (1, -2),
    (-1, -2),
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
];

fn same_half(a: Square, b: Square) -> bool {
    (a.rank().index() <= 4) == (b.rank().index() <= 4)
}

impl StepTable {
    fn new() -> Self {
        let mut king_effect = [Bitboard::EMPTY; Square::NUM];
        let mut advisor_effect = [Bitboard::EMPTY; Square::NUM];
        let mut pawn_effect = [[Bitboard::EMPTY; Square::NUM]; Color::NUM];
        let mut pawn_to_effect = [[Bitboard::EMPTY; Square::NUM]; Color::NUM];
        let mut knight_leg_mask = [Bitboard::EMPTY; Square::NUM];
        let mut bishop_eye_mask = [Bitboard::EMPTY; Square::NUM];
        let knight_pairs: [Vec<(Square, Square)>; Square::NUM] =
            std::array::from_fn(|s| build_knight_pairs(s));
        let knight_to_pairs: [Vec<(Square, Square)>; Square::NUM] =
            std::array::from_fn(|s| build_knight_to_pairs(s));
        let bishop_pairs: [Vec<(Square, Square)>; Square::NUM] =
            std::array::from_fn(|s| build_bishop_pairs(s));

        for sq in Square::all() {
            let file = sq.file().index() as i32;
            let rank = sq.rank().index() as i32;

            if PALACE_BB.contains(sq) {
                for (df, dr) in ORTHO_DIRS {
                    if in_bounds(file + df, rank + dr) {
                        let to = square_from_coords(file + df, rank + dr);
                        if PALACE_BB.contains(to) {
                            king_effect[sq.index()].set(to);
                        }
                    }
                }
                for (df, dr) in DIAG_DIRS {
                    if in_bounds(file + df, rank + dr) {
                        let to = square_from_coords(file + df, rank + dr);
                        if PALACE_BB.contains(to) {
                            advisor_effect[sq.index()].set(to);
                        }
                    }
                }
            }

            for color in [Color::White, Color::Black] {
                let fwd = if color == Color::White { 1 } else { -1 };
                let crossed = !sq.rank().is_home_half(color);

                // 前進1升、渡河後は横1升も
                if in_bounds(file, rank + fwd) {
                    pawn_effect[color.index()][sq.index()]
                        .set(square_from_coords(file, rank + fwd));
                }
                if crossed {
                    for df in [-1, 1] {
                        if in_bounds(file + df, rank) {
                            pawn_effect[color.index()][sq.index()]
                                .set(square_from_coords(file + df, rank));
                        }
                    }
                }

                // 逆引き: sqに利かせられる兵の位置。後方1升は常に、
                // 横隣はその升自体が渡河済みの場合のみ。
                if in_bounds(file, rank - fwd) {
                    pawn_to_effect[color.index()][sq.index()]
                        .set(square_from_coords(file, rank - fwd));
                }
                for df in [-1, 1] {
                    if in_bounds(file + df, rank) {
                        let side = square_from_coords(file + df, rank);
                        if !side.rank().is_home_half(color) {
                            pawn_to_effect[color.index()][sq.index()].set(side);
                        }
                    }
                }
            }

            for (df, dr) in ORTHO_DIRS {
                if in_bounds(file + df, rank + dr) {
                    knight_leg_mask[sq.index()].set(square_from_coords(file + df, rank + dr));
                }
            }
            for (df, dr) in DIAG_DIRS {
                if in_bounds(file + df, rank + dr) {
                    bishop_eye_mask[sq.index()].set(square_from_coords(file + df, rank + dr));
                }
            }
        }

        StepTable {
            king_effect,
            advisor_effect,
            pawn_effect,
            pawn_to_effect,
            knight_pairs,
            knight_to_pairs,
            bishop_pairs,
            knight_leg_mask,
            bishop_eye_mask,
        }
    }
}

fn build_knight_pairs(s: usize) -> Vec<(Square, Square)> {
    let file = (s % 9) as i32;
    let rank = (s / 9) as i32;
    let mut pairs = Vec::new();
    for (df, dr) in KNIGHT_DIRS {
        if !in_bounds(file + df, rank + dr) {
            continue;
        }
        let to = square_from_coords(file + df, rank + dr);
        // 馬脚は長軸方向の隣接升
        let leg = if df.abs() == 2 {
            square_from_coords(file + df.signum(), rank)
        } else {
            square_from_coords(file, rank + dr.signum())
        };
        pairs.push((leg, to));
    }
    pairs
}

fn build_knight_to_pairs(s: usize) -> Vec<(Square, Square)> {
    let file = (s % 9) as i32;
    let rank = (s / 9) as i32;
    let mut pairs = Vec::new();
    for (df, dr) in KNIGHT_DIRS {
        if !in_bounds(file + df, rank + dr) {
            continue;
        }
        let from = square_from_coords(file + df, rank + dr);
        // fromからsへの跳びの馬脚はfrom側の隣接升 = sの斜め隣
        let leg = square_from_coords(file + df.signum(), rank + dr.signum());
        pairs.push((leg, from));
    }
    pairs
}

fn build_bishop_pairs(s: usize) -> Vec<(Square, Square)> {
    let file = (s % 9) as i32;
    let rank = (s / 9) as i32;
    let sq = square_from_coords(file, rank);
    let mut pairs = Vec::new();
    for (df, dr) in DIAG_DIRS {
        if !in_bounds(file + 2 * df, rank + 2 * dr) {
            continue;
        }
        let to = square_from_coords(file + 2 * df, rank + 2 * dr);
        // 象は河を渡れない
        if !same_half(sq, to) {
            continue;
        }
        let eye = square_from_coords(file + df, rank + dr);
        pairs.push((eye, to));
    }
    pairs
}

/// 帥の利き（九宮内の直進1升）
#[inline]
pub fn king_effect(sq: Square) -> Bitboard {
    step_table().king_effect[sq.index()]
}

/// 士の利き（九宮内の斜め1升）
#[inline]
pub fn advisor_effect(sq: Square) -> Bitboard {
    step_table().advisor_effect[sq.index()]
}

/// 兵の利き（前進1升、渡河後は横1升も）
#[inline]
pub fn pawn_effect(color: Color, sq: Square) -> Bitboard {
    step_table().pawn_effect[color.index()][sq.index()]
}

/// 指定升に利かせられる兵の位置（逆引き）
#[inline]
pub fn pawn_to_effect(color: Color, sq: Square) -> Bitboard {
    step_table().pawn_to_effect[color.index()][sq.index()]
}

/// 馬の利き（馬脚が空いている方向のみ）
#[inline]
pub fn knight_effect(sq: Square, occupied: Bitboard) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(leg, to) in &step_table().knight_pairs[sq.index()] {
        if !occupied.contains(leg) {
            bb.set(to);
        }
    }
    bb
}

/// 指定升に馬の利きを通せる位置（逆引き）
///
/// 馬脚が攻撃元側の隣接升になるため、順方向の利きとは一致しない。
#[inline]
pub fn knight_to_effect(sq: Square, occupied: Bitboard) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(leg, from) in &step_table().knight_to_pairs[sq.index()] {
        if !occupied.contains(leg) {
            bb.set(from);
        }
    }
    bb
}

/// 象の利き（象眼が空いている方向のみ、渡河不可）
#[inline]
pub fn bishop_effect(sq: Square, occupied: Bitboard) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(eye, to) in &step_table().bishop_pairs[sq.index()] {
        if !occupied.contains(eye) {
            bb.set(to);
        }
    }
    bb
}

/// 馬脚となりうる隣接升のマスク（直進隣4升）
///
/// この升の駒が動くと利きが変化しうる馬は、このマスク上に立っている。
#[inline]
pub fn knight_leg_mask(sq: Square) -> Bitboard {
    step_table().knight_leg_mask[sq.index()]
}

/// 象眼となりうる隣接升のマスク（斜め隣4升）
#[inline]
pub fn bishop_eye_mask(sq: Square) -> Bitboard {
    step_table().bishop_eye_mask[sq.index()]
}
