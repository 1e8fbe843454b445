//! 捉（チェイス）の検出と反復（千日手・長将・長捉）の判定
//!
//! 直前の手によって新たに生じた「当たり」の対象升集合を `chased` として
//! 状態に記録し、反復検出時に各手前の `chased` を手の分だけ巻き戻して
//! 交差を取る。交差が空でなく王手の連続でもなければ長捉として、
//! 一方的に追いかけた側の負けを返す。
//!
//! 当たりの定義（ルール上の捉）:
//! - 王手と、渡河前の兵への当たりは除外
//! - 馬・砲が車に当てる手、士・象が車・砲・馬に当てる手は無条件で数える
//! - 相打ちになる対称の当たりは除外（馬は利きが非対称なので例外、
//!   ピンされた駒の「取り返し」も実際には動けないので例外）
//! - 守られていない駒への当たりだけを数える。守り駒が玉しかなく、
//!   その玉が対面の筋で動けない場合も「守られていない」扱い

use crate::bitboard::{
    attacks_bb, between_bb, bishop_eye_mask, king_effect, knight_leg_mask, knight_to_effect,
    line_bb, pawn_effect, rook_effect, rook_step_effect, Bitboard, HALF_BB,
};
use crate::types::{Move, PieceType, Square, Value};

use super::Position;

impl Position {
    /// 直前の手で生じている捉の対象升を求める
    ///
    /// 返り値は手番側（追われている側）の駒の升集合。
    pub(crate) fn chased(&self) -> Bitboard {
        let mut b = Bitboard::EMPTY;
        let st = self.st();
        if st.last_move.is_none() || !st.last_move.is_ok() {
            return b;
        }

        let us = self.side_to_move;
        let them = !us;

        // 対面の筋に1枚しか挟まっていない自駒は実質ピンされている
        let mut pins = self.blockers_for_king(us);
        let our_king = self.king_square(us);
        let opp_king = self.king_square(them);
        if our_king.file() == opp_king.file() {
            let king_file_pieces =
                between_bb(our_king, opp_king) ^ Bitboard::from_square(opp_king);
            if !(king_file_pieces & self.occupied()).more_than_one() {
                pins |= king_file_pieces & self.pieces_c(us);
            }
        }

        // 直接の当たり
        let from = st.last_move.from_sq();
        let to = st.last_move.to_sq();
        let moved_piece = self.piece_on(to).piece_type();
        if moved_piece != PieceType::King && moved_piece != PieceType::Pawn {
            let mut direct_attacks =
                attacks_bb(moved_piece, to, self.occupied()) & self.pieces_c(us);
            // 新たに生じた当たりだけを数える。遠方駒は移動線上の利きを
            // 移動前から持っていたので除く。
            if moved_piece == PieceType::Rook || moved_piece == PieceType::Cannon {
                direct_attacks &= !line_bb(from, to);
            }
            self.add_chased(&mut b, to, moved_piece, direct_attacks, pins);
        }

        // 開き当たり: 移動元の升が空いたことで利きが通るようになった駒
        let discovery_candidates = (knight_leg_mask(from) & self.pieces(them, PieceType::Knight))
            | (bishop_eye_mask(from) & self.pieces(them, PieceType::Bishop))
            | (rook_step_effect(from)
                & (self.pieces(them, PieceType::Cannon) | self.pieces(them, PieceType::Rook)))
            | (rook_effect(to, self.occupied()) & self.pieces(them, PieceType::Cannon));
        for s in discovery_candidates {
            let discovery_piece = self.piece_on(s).piece_type();
            // 移動前の占有を復元する（取った駒は移動先に居た）
            let previous_occ = if self.captured_piece().is_some() {
                self.occupied() ^ from
            } else {
                self.occupied() ^ to ^ from
            };
            let discoveries = self.pieces_c(us)
                & attacks_bb(discovery_piece, s, self.occupied())
                & !attacks_bb(discovery_piece, s, previous_occ);
            self.add_chased(&mut b, s, discovery_piece, discoveries, pins);
        }

        // ピン関係の変化による当たりと、開き王手に伴う取りの脅し
        if st.plies_from_null > 0 {
            let prev = &self.states[self.states.len() - 2];

            // 新たにピンされた自駒が守っていた駒は根がなくなる
            let mut new_pins = st.blockers_for_king[us.index()]
                & !prev.blockers_for_king[us.index()]
                & self.pieces_c(us);
            while let Some(s) = new_pins.pop_lsb() {
                let pinned_piece = self.piece_on(s).piece_type();
                let mut fake_rooted = self.pieces_c(us)
                    & !((self.pieces(us, PieceType::King) | self.pieces(us, PieceType::Pawn))
                        ^ (self.pieces(us, PieceType::Pawn) & HALF_BB[them.index()]));
                if pinned_piece == PieceType::Pawn {
                    fake_rooted &= pawn_effect(us, s);
                } else {
                    fake_rooted &= attacks_bb(pinned_piece, s, self.occupied());
                }
                for s2 in fake_rooted {
                    if !(self.attackers_to(s2)
                        & self.pieces_c(them)
                        & !st.blockers_for_king[them.index()])
                        .is_empty()
                    {
                        b |= Bitboard::from_square(s2);
                    }
                }
            }

            // 新たに開き王手をかけられる形になった敵駒の取りの脅し
            let mut new_discoverers = st.blockers_for_king[us.index()]
                & !prev.blockers_for_king[us.index()]
                & self.pieces_c(them);
            while let Some(s) = new_discoverers.pop_lsb() {
                let discovery_piece = self.piece_on(s).piece_type();
                let mut discovery_attacks = self.pieces_c(us);
                if discovery_piece == PieceType::Pawn {
                    discovery_attacks &= pawn_effect(them, s);
                } else {
                    discovery_attacks &= attacks_bb(discovery_piece, s, self.occupied());
                }

                // 玉で取り返せない升は全て脅威
                b |= discovery_attacks & !king_effect(our_king);
                // 玉で取り返せる升も、その取り返しが違法なら脅威
                discovery_attacks &= king_effect(our_king);
                for s2 in discovery_attacks {
                    if !(self.attackers_to_occ(s2, self.occupied() ^ s ^ our_king)
                        & self.pieces_c(them)
                        & !Bitboard::from_square(s))
                        .is_empty()
                    {
                        b |= Bitboard::from_square(s2);
                    }
                }
            }
        }

        b
    }

    /// 当たり候補を検査して捉の集合へ追加する
    fn add_chased(
        &self,
        b: &mut Bitboard,
        attacker_sq: Square,
        attacker_type: PieceType,
        mut attacks: Bitboard,
        pins: Bitboard,
    ) {
        if (attacks & !*b).is_empty() {
            return;
        }

        let us = self.side_to_move;
        let them = !us;

        // 王手と渡河前の兵への当たりは捉にならない
        attacks &= !((self.pieces(us, PieceType::King) | self.pieces(us, PieceType::Pawn))
            ^ (self.pieces(us, PieceType::Pawn) & HALF_BB[them.index()]));

        // 価値の高い駒への当たりは無条件に数える
        if attacker_type == PieceType::Knight || attacker_type == PieceType::Cannon {
            *b |= attacks & self.pieces(us, PieceType::Rook);
        }
        if attacker_type == PieceType::Bishop || attacker_type == PieceType::Advisor {
            *b |= attacks
                & (self.pieces(us, PieceType::Rook)
                    | self.pieces(us, PieceType::Cannon)
                    | self.pieces(us, PieceType::Knight));
        }

        // 相打ちの当たりは除外。ただし馬は利きが非対称なので取り返せる
        // とは限らず、ピンされた駒も実際には取り返せない。
        if attacker_type == PieceType::Knight {
            attacks &= !knight_to_effect(attacker_sq, self.occupied()) | pins;
        } else {
            attacks &= !self.pieces(us, attacker_type) | pins;
        }

        // 守られていない駒への当たりだけを数える
        for s in attacks {
            let roots = self.attackers_to_occ(s, self.occupied() ^ attacker_sq)
                & self.pieces_c(us)
                & !pins;
            if roots.is_empty()
                || (roots == self.pieces(us, PieceType::King)
                    && rook_effect(self.king_square(them), self.occupied() ^ attacker_sq)
                        .contains(s))
            {
                *b |= Bitboard::from_square(s);
            }
        }
    }

    /// 捉の対象集合を指し手1つぶん巻き戻す
    ///
    /// 対象駒が直前の手で動いた駒なら、移動前の升に読み替える。
    #[inline]
    fn undo_move_board(b: Bitboard, m: Move) -> Bitboard {
        if m.is_ok() && b.contains(m.to_sq()) {
            (b ^ m.to_sq()) | m.from_sq()
        } else {
            b
        }
    }

    /// 反復（千日手・長将・長捉）の判定
    ///
    /// StateInfoの連鎖を2手刻みで遡り、同一キーの出現を数える。探索根より
    /// 後での1回目の再現、または根以前を含む2回目の再現で結果を返す。
    ///
    /// - 相手だけが王手を続けていた: 相手の負け（`MATE - ply`）
    /// - 自分だけが王手を続けていた: 自分の負け（`-MATE + ply`）
    /// - 王手がなく一方だけが捉を続けていた: 追った側の負け
    /// - 双方またはどちらでもない: 引き分け
    pub fn is_repeated(&self, ply: i32) -> Option<Value> {
        let st = self.st();
        if st.plies_from_null < 4 {
            return None;
        }

        let idx = self.states.len() - 1;
        let mut stp_i = idx - 2;
        let mut cnt = 0;

        let mut perpetual_them =
            !st.checkers_bb.is_empty() && !self.states[idx - 2].checkers_bb.is_empty();
        let mut perpetual_us = !self.states[idx - 1].checkers_bb.is_empty()
            && !self.states[idx - 3].checkers_bb.is_empty();
        let mut chase_them = Self::undo_move_board(st.chased, self.states[idx - 1].last_move)
            & self.states[idx - 2].chased;
        let mut chase_us =
            Self::undo_move_board(self.states[idx - 1].chased, self.states[idx - 2].last_move)
                & self.states[idx - 3].chased;

        let mut i = 4;
        while i <= st.plies_from_null {
            // 直前の手がない最古の状態では捉の集合は空
            if i != st.plies_from_null {
                chase_them =
                    Self::undo_move_board(chase_them, self.states[stp_i - 1].last_move)
                        & self.states[stp_i - 2].chased;
            }
            stp_i -= 2;
            perpetual_them &= !self.states[stp_i].checkers_bb.is_empty();

            if self.states[stp_i].key == st.key {
                cnt += 1;
                if cnt == if ply > i { 1 } else { 2 } {
                    let result = if perpetual_them || perpetual_us {
                        if !perpetual_us {
                            Value::mate_in(ply)
                        } else if !perpetual_them {
                            Value::mated_in(ply)
                        } else {
                            Value::DRAW
                        }
                    } else if !chase_them.is_empty() || !chase_us.is_empty() {
                        if chase_us.is_empty() {
                            Value::mate_in(ply)
                        } else if chase_them.is_empty() {
                            Value::mated_in(ply)
                        } else {
                            Value::DRAW
                        }
                    } else {
                        Value::DRAW
                    };
                    return Some(result);
                }
            }

            if i + 1 <= st.plies_from_null {
                perpetual_us &= !self.states[stp_i - 1].checkers_bb.is_empty();
                chase_us = Self::undo_move_board(chase_us, self.states[stp_i].last_move)
                    & self.states[stp_i - 1].chased;
            }

            i += 2;
        }

        None
    }
}
