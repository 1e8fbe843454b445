//! Zobristハッシュ乱数テーブル
//!
//! プロセス全体で共有する読み取り専用の乱数表。固定シードから生成する
//! ため、どの実装・どの実行でも同一局面のキーは一致する（エンジン間
//! テストの前提）。生成器は xorshift64*:
//!
//! ```text
//! s ^= s >> 12;  s ^= s << 25;  s ^= s >> 27;
//! return s * 0x2545F4914F6CDD1D
//! ```
//!
//! シードは 1070372。駒×升の乱数は紅の車士砲兵馬象帥、黒の同順に、
//! 各駒について升 a0..i9 の昇順で引き、最後に手番キーを引く。

use std::sync::OnceLock;

use crate::types::{Key, Piece, Square};

/// xorshift64* 疑似乱数生成器
struct Prng {
    s: u64,
}

impl Prng {
    fn new(seed: u64) -> Prng {
        debug_assert!(seed != 0);
        Prng { s: seed }
    }

    fn rand64(&mut self) -> u64 {
        self.s ^= self.s >> 12;
        self.s ^= self.s << 25;
        self.s ^= self.s >> 27;
        self.s.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

struct Zobrist {
    psq: [[Key; Square::NUM]; Piece::NUM],
    side: Key,
}

static ZOBRIST: OnceLock<Zobrist> = OnceLock::new();

fn zobrist() -> &'static Zobrist {
    ZOBRIST.get_or_init(|| {
        let mut rng = Prng::new(1070372);
        let mut psq = [[0u64; Square::NUM]; Piece::NUM];
        for pc in Piece::ALL {
            for sq in Square::all() {
                psq[pc.index()][sq.index()] = rng.rand64();
            }
        }
        let side = rng.rand64();
        Zobrist { psq, side }
    })
}

/// 駒×升の乱数
#[inline]
pub fn zobrist_psq(pc: Piece, sq: Square) -> Key {
    zobrist().psq[pc.index()][sq.index()]
}

/// 手番（黒番）の乱数
#[inline]
pub fn zobrist_side() -> Key {
    zobrist().side
}
