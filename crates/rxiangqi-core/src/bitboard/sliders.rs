//! 遠方駒（車・砲）の利き計算
//!
//! 方向別レイテーブルから最初の遮り駒を求めて利きを打ち切る。
//! 砲はスクリーン（台駒）を1枚越えた先、2枚目の駒までが利き。

use std::sync::OnceLock;

use crate::types::{PieceType, Square};

use super::{
    advisor_effect, bishop_effect, king_effect, knight_effect, Bitboard, FILE_BB, RANK_BB,
};

/// レイの方向（N/Eは升番号の昇順、S/Wは降順）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direct {
    N = 0,
    S = 1,
    E = 2,
    W = 3,
}

const DIRECTS: [Direct; 4] = [Direct::N, Direct::S, Direct::E, Direct::W];

struct SliderTable {
    ray: [[Bitboard; Square::NUM]; 4],
}

static SLIDER_TABLE: OnceLock<SliderTable> = OnceLock::new();

fn slider_table() -> &'static SliderTable {
    SLIDER_TABLE.get_or_init(SliderTable::new)
}

impl SliderTable {
    fn new() -> Self {
        let mut ray = [[Bitboard::EMPTY; Square::NUM]; 4];
        for sq in Square::all() {
            let file = sq.file().index() as i32;
            let rank = sq.rank().index() as i32;
            for dir in DIRECTS {
                let (df, dr) = dir.delta();
                let mut f = file + df;
                let mut r = rank + dr;
                while (0..=8).contains(&f) && (0..=9).contains(&r) {
                    // SAFETY: 直前の範囲チェックで盤内を保証
                    ray[dir as usize][sq.index()]
                        .set(unsafe { Square::from_u8_unchecked((r * 9 + f) as u8) });
                    f += df;
                    r += dr;
                }
            }
        }
        SliderTable { ray }
    }
}

impl Direct {
    #[inline]
    const fn delta(self) -> (i32, i32) {
        match self {
            Direct::N => (0, 1),
            Direct::S => (0, -1),
            Direct::E => (1, 0),
            Direct::W => (-1, 0),
        }
    }

    /// レイ上の遮り駒のうち起点に最も近いもの
    #[inline]
    fn closest(self, blockers: Bitboard) -> Option<Square> {
        match self {
            Direct::N | Direct::E => blockers.lsb(),
            Direct::S | Direct::W => blockers.msb(),
        }
    }
}

/// 車の利き
pub fn rook_effect(sq: Square, occupied: Bitboard) -> Bitboard {
    let table = slider_table();
    let mut attacks = Bitboard::EMPTY;
    for dir in DIRECTS {
        let ray = table.ray[dir as usize][sq.index()];
        attacks |= ray;
        if let Some(first) = dir.closest(ray & occupied) {
            // 最初の遮り駒の先を落とす（遮り駒自身は利きに残る）
            attacks ^= table.ray[dir as usize][first.index()];
        }
    }
    attacks
}

/// 砲の利き（跳び越え）
///
/// スクリーンの次の升から2枚目の駒（これを含む）まで。2枚目が無ければ
/// 盤端まで。空き升も含むのは、そこへ砲が移動すると王手/当たりになる
/// 判定（checkSquares）を逆引きで共有するため。
pub fn cannon_effect(sq: Square, occupied: Bitboard) -> Bitboard {
    let table = slider_table();
    let mut attacks = Bitboard::EMPTY;
    for dir in DIRECTS {
        let ray = table.ray[dir as usize][sq.index()];
        let Some(screen) = dir.closest(ray & occupied) else {
            continue;
        };
        let behind = table.ray[dir as usize][screen.index()];
        attacks |= behind;
        if let Some(second) = dir.closest(behind & occupied) {
            attacks ^= table.ray[dir as usize][second.index()];
        }
    }
    attacks
}

/// 車の空盤利き（同筋・同段の全升）
#[inline]
pub fn rook_step_effect(sq: Square) -> Bitboard {
    (FILE_BB[sq.file().index()] | RANK_BB[sq.rank().index()]) ^ Bitboard::from_square(sq)
}

/// 2升間のビットボード
///
/// 終点sq2は含み、始点sq1は含まない。同筋・同段なら間の升全て、
/// 馬の跳び位置なら馬脚（sq2側）、象の位置関係なら象眼。
/// いずれでもなければ空。遮断判定をこの1本に集約している。
pub fn between_bb(sq1: Square, sq2: Square) -> Bitboard {
    if sq1 == sq2 {
        return Bitboard::EMPTY;
    }

    let f1 = sq1.file().index() as i32;
    let r1 = sq1.rank().index() as i32;
    let f2 = sq2.file().index() as i32;
    let r2 = sq2.rank().index() as i32;
    let df = f2 - f1;
    let dr = r2 - r1;

    let mut result = Bitboard::from_square(sq2);

    if df == 0 || dr == 0 {
        let fs = df.signum();
        let rs = dr.signum();
        let mut f = f1 + fs;
        let mut r = r1 + rs;
        while f != f2 || r != r2 {
            // SAFETY: sq1-sq2間なので盤内
            result.set(unsafe { Square::from_u8_unchecked((r * 9 + f) as u8) });
            f += fs;
            r += rs;
        }
    } else if (df.abs() == 1 && dr.abs() == 2) || (df.abs() == 2 && dr.abs() == 1) {
        // sq2の馬がsq1へ跳ぶときの馬脚
        let (lf, lr) = if df.abs() == 2 {
            (f2 - df.signum(), r2)
        } else {
            (f2, r2 - dr.signum())
        };
        // SAFETY: sq2の隣接升で盤内
        result.set(unsafe { Square::from_u8_unchecked((lr * 9 + lf) as u8) });
    } else if df.abs() == 2 && dr.abs() == 2 {
        // SAFETY: 中点は盤内
        result.set(unsafe {
            Square::from_u8_unchecked((((r1 + r2) / 2 * 9) + (f1 + f2) / 2) as u8)
        });
    } else {
        return Bitboard::EMPTY;
    }

    result
}

/// 2升を通る直線上のビットボード（両端を含む、直線上でなければ空）
pub fn line_bb(sq1: Square, sq2: Square) -> Bitboard {
    if sq1 == sq2 {
        return Bitboard::EMPTY;
    }
    if sq1.file() == sq2.file() {
        FILE_BB[sq1.file().index()]
    } else if sq1.rank() == sq2.rank() {
        RANK_BB[sq1.rank().index()]
    } else {
        Bitboard::EMPTY
    }
}

/// 3升が同一直線上にあり、かつsq3がsq1-sq2の直線に乗っているか
#[inline]
pub fn aligned(sq1: Square, sq2: Square, sq3: Square) -> bool {
    line_bb(sq1, sq3).contains(sq2)
}

/// 駒種別の利き（兵は手番依存のため `pawn_effect` を使うこと）
pub fn attacks_bb(pt: PieceType, sq: Square, occupied: Bitboard) -> Bitboard {
    match pt {
        PieceType::Rook => rook_effect(sq, occupied),
        PieceType::Cannon => cannon_effect(sq, occupied),
        PieceType::Knight => knight_effect(sq, occupied),
        PieceType::Bishop => bishop_effect(sq, occupied),
        PieceType::Advisor => advisor_effect(sq),
        PieceType::King => king_effect(sq),
        PieceType::Pawn => unreachable!("attacks_bb: pawn effect requires a color"),
    }
}
