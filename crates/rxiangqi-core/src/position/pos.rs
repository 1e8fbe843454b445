//! 局面本体（Position）
//!
//! 盤面配列・駒種別/手番別Bitboard・駒数・手番・手数と、`StateInfo` の
//! スタックを保持する。盤面表現は `put_piece` / `remove_piece` /
//! `move_piece` を通じてのみ更新し、常に相互に整合させる。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;

use crate::bitboard::{
    advisor_effect, attacks_bb, between_bb, bishop_effect, cannon_effect, king_effect,
    knight_effect, knight_to_effect, pawn_effect, pawn_to_effect, rook_effect, rook_step_effect,
    Bitboard,
};
use crate::prefetch::TtPrefetch;
use crate::types::{Color, Key, Move, Piece, PieceType, Square, Value};

use super::{zobrist_psq, zobrist_side, StateInfo};

/// 探索スレッドのノードカウンタ
///
/// `do_move` 1回につき1加算される。統計用途のみなのでRelaxedで足す。
#[derive(Debug, Default)]
pub struct NodeCounter(AtomicU64);

impl NodeCounter {
    pub fn new() -> NodeCounter {
        NodeCounter(AtomicU64::new(0))
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// 局面
#[derive(Debug, Clone)]
pub struct Position {
    pub(crate) board: [Piece; Square::NUM],
    pub(crate) by_type_bb: [Bitboard; PieceType::NUM],
    pub(crate) by_color_bb: [Bitboard; Color::NUM],
    pub(crate) piece_count: [u8; Piece::NUM],
    pub(crate) side_to_move: Color,
    pub(crate) game_ply: i32,
    pub(crate) states: Vec<StateInfo>,
    pub(crate) nodes: Option<Arc<NodeCounter>>,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// 空の局面を生成する（`set` で初期化すること）
    pub fn new() -> Position {
        Position {
            board: [Piece::NONE; Square::NUM],
            by_type_bb: [Bitboard::EMPTY; PieceType::NUM],
            by_color_bb: [Bitboard::EMPTY; Color::NUM],
            piece_count: [0; Piece::NUM],
            side_to_move: Color::White,
            game_ply: 0,
            states: Vec::new(),
            nodes: None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.board = [Piece::NONE; Square::NUM];
        self.by_type_bb = [Bitboard::EMPTY; PieceType::NUM];
        self.by_color_bb = [Bitboard::EMPTY; Color::NUM];
        self.piece_count = [0; Piece::NUM];
        self.side_to_move = Color::White;
        self.game_ply = 0;
        self.states.clear();
        self.nodes = None;
    }

    // =========================================================================
    // 盤面アクセサ
    // =========================================================================

    /// 升上の駒
    #[inline]
    pub fn piece_on(&self, sq: Square) -> Piece {
        self.board[sq.index()]
    }

    /// 升が空かどうか
    #[inline]
    pub fn empty(&self, sq: Square) -> bool {
        self.board[sq.index()].is_none()
    }

    /// 全駒の占有
    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.by_color_bb[0] | self.by_color_bb[1]
    }

    /// 手番側の全駒
    #[inline]
    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.by_color_bb[c.index()]
    }

    /// 駒種別の全駒（両手番）
    #[inline]
    pub fn pieces_pt(&self, pt: PieceType) -> Bitboard {
        self.by_type_bb[pt.index()]
    }

    /// 手番×駒種の駒
    #[inline]
    pub fn pieces(&self, c: Color, pt: PieceType) -> Bitboard {
        self.by_color_bb[c.index()] & self.by_type_bb[pt.index()]
    }

    /// 駒数
    #[inline]
    pub fn count(&self, pc: Piece) -> u32 {
        self.piece_count[pc.index()] as u32
    }

    /// 玉の位置
    #[inline]
    pub fn king_square(&self, c: Color) -> Square {
        debug_assert!(self.pieces(c, PieceType::King).count() == 1);
        self.pieces(c, PieceType::King).lsb().expect("king must be on the board")
    }

    /// 手番
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// 初期局面からの手数
    #[inline]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    // =========================================================================
    // StateInfoアクセサ
    // =========================================================================

    #[inline]
    pub(crate) fn st(&self) -> &StateInfo {
        self.states.last().expect("state stack must not be empty")
    }

    #[inline]
    pub(crate) fn st_mut(&mut self) -> &mut StateInfo {
        self.states.last_mut().expect("state stack must not be empty")
    }

    /// 現局面の状態スナップショット
    #[inline]
    pub fn state(&self) -> &StateInfo {
        self.st()
    }

    /// Zobristキー
    #[inline]
    pub fn key(&self) -> Key {
        self.st().key
    }

    /// 手番側の玉に王手している駒
    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.st().checkers_bb
    }

    /// 王手がかかっているか
    #[inline]
    pub fn in_check(&self) -> bool {
        !self.checkers().is_empty()
    }

    /// c側の玉への利きを遮っている駒
    #[inline]
    pub fn blockers_for_king(&self, c: Color) -> Bitboard {
        self.st().blockers_for_king[c.index()]
    }

    /// c側の駒で相手の遮り駒をピンしているもの
    #[inline]
    pub fn pinners(&self, c: Color) -> Bitboard {
        self.st().pinners[c.index()]
    }

    /// そこに動くと敵玉へ王手となる升
    #[inline]
    pub fn check_squares(&self, pt: PieceType) -> Bitboard {
        self.st().check_squares[pt.index()]
    }

    /// 直前の手で取られた駒
    #[inline]
    pub fn captured_piece(&self) -> Piece {
        self.st().captured_piece
    }

    /// 兵・帥以外の駒割り
    #[inline]
    pub fn non_pawn_material(&self, c: Color) -> Value {
        self.st().non_pawn_material[c.index()]
    }

    /// 指し手で動く駒
    #[inline]
    pub fn moved_piece(&self, m: Move) -> Piece {
        self.piece_on(m.from_sq())
    }

    /// 取る手かどうか
    #[inline]
    pub fn is_capture(&self, m: Move) -> bool {
        self.piece_on(m.to_sq()).is_some()
    }

    // =========================================================================
    // 盤面更新（下位操作）
    // =========================================================================

    pub(crate) fn put_piece(&mut self, pc: Piece, sq: Square) {
        debug_assert!(self.empty(sq), "put_piece: {sq} is occupied");
        self.board[sq.index()] = pc;
        self.by_type_bb[pc.piece_type().index()].set(sq);
        self.by_color_bb[pc.color().index()].set(sq);
        self.piece_count[pc.index()] += 1;
    }

    pub(crate) fn remove_piece(&mut self, sq: Square) {
        let pc = self.board[sq.index()];
        debug_assert!(pc.is_some(), "remove_piece: {sq} is empty");
        self.board[sq.index()] = Piece::NONE;
        self.by_type_bb[pc.piece_type().index()].clear(sq);
        self.by_color_bb[pc.color().index()].clear(sq);
        self.piece_count[pc.index()] -= 1;
    }

    pub(crate) fn move_piece(&mut self, from: Square, to: Square) {
        let pc = self.board[from.index()];
        debug_assert!(pc.is_some() && self.empty(to));
        let mask = Bitboard::from_square(from) | Bitboard::from_square(to);
        self.by_type_bb[pc.piece_type().index()] ^= mask;
        self.by_color_bb[pc.color().index()] ^= mask;
        self.board[from.index()] = Piece::NONE;
        self.board[to.index()] = pc;
    }

    // =========================================================================
    // 利き・王手の導出
    // =========================================================================

    /// 指定升に利いている駒（両手番）
    #[inline]
    pub fn attackers_to(&self, sq: Square) -> Bitboard {
        self.attackers_to_occ(sq, self.occupied())
    }

    /// 指定升に利いている駒（占有指定）
    pub fn attackers_to_occ(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        (pawn_to_effect(Color::White, sq) & self.pieces(Color::White, PieceType::Pawn))
            | (pawn_to_effect(Color::Black, sq) & self.pieces(Color::Black, PieceType::Pawn))
            | (knight_to_effect(sq, occupied) & self.pieces_pt(PieceType::Knight))
            | (rook_effect(sq, occupied) & self.pieces_pt(PieceType::Rook))
            | (cannon_effect(sq, occupied) & self.pieces_pt(PieceType::Cannon))
            | (bishop_effect(sq, occupied) & self.pieces_pt(PieceType::Bishop))
            | (advisor_effect(sq) & self.pieces_pt(PieceType::Advisor))
            | (king_effect(sq) & self.pieces_pt(PieceType::King))
    }

    /// c側の駒で指定升に王手をかけられるもの
    ///
    /// 王手になりうる駒種（兵・馬・車・砲）のみ。士・象・帥は敵玉に
    /// 王手できない（対面は `legal` が弾く）。
    pub fn checkers_to(&self, c: Color, sq: Square, occupied: Bitboard) -> Bitboard {
        ((pawn_to_effect(c, sq) & self.pieces_pt(PieceType::Pawn))
            | (knight_to_effect(sq, occupied) & self.pieces_pt(PieceType::Knight))
            | (rook_effect(sq, occupied) & self.pieces_pt(PieceType::Rook))
            | (cannon_effect(sq, occupied) & self.pieces_pt(PieceType::Cannon)))
            & self.pieces_c(c)
    }

    /// 玉への利きを遮っている駒とピン駒を求める
    ///
    /// 砲は「2枚遮り」のスナイパー: 玉との間にちょうど2枚（スクリーンと
    /// 遮り駒）あるときだけ遮りが成立する。車・対面の帥は1枚。占有から
    /// 砲以外のスナイパーを除くのは、砲がスクリーンを必要とするため。
    pub(crate) fn blockers_for(&self, sliders: Bitboard, s: Square) -> (Bitboard, Bitboard) {
        let mut blockers = Bitboard::EMPTY;
        let mut pinners = Bitboard::EMPTY;

        let rook_like = self.pieces_pt(PieceType::Rook)
            | self.pieces_pt(PieceType::Cannon)
            | self.pieces_pt(PieceType::King);
        let snipers = ((rook_step_effect(s) & rook_like)
            | (knight_effect(s, Bitboard::EMPTY) & self.pieces_pt(PieceType::Knight)))
            & sliders;
        let occupancy = self.occupied() ^ (snipers & !self.pieces_pt(PieceType::Cannon));

        for sniper_sq in snipers {
            let is_cannon = self.piece_on(sniper_sq).piece_type() == PieceType::Cannon;
            let b = between_bb(s, sniper_sq)
                & if is_cannon { self.occupied() ^ sniper_sq } else { occupancy };

            if !b.is_empty()
                && ((!is_cannon && !b.more_than_one()) || (is_cannon && b.count() == 2))
            {
                blockers |= b;
                if !(b & self.pieces_c(self.piece_on(s).color())).is_empty() {
                    pinners |= Bitboard::from_square(sniper_sq);
                }
            }
        }
        (blockers, pinners)
    }

    // =========================================================================
    // 状態の再計算
    // =========================================================================

    /// 現局面からStateInfoを再構築する（`set` と整合性検査用）
    pub(crate) fn set_state(&mut self) {
        let mut key: Key = 0;
        let mut npm = [Value::ZERO; Color::NUM];

        for sq in self.occupied() {
            let pc = self.piece_on(sq);
            key ^= zobrist_psq(pc, sq);
            let pt = pc.piece_type();
            if pt != PieceType::King && pt != PieceType::Pawn {
                npm[pc.color().index()] += pt.mg_value();
            }
        }
        if self.side_to_move == Color::Black {
            key ^= zobrist_side();
        }

        let checkers =
            self.checkers_to(!self.side_to_move, self.king_square(self.side_to_move), self.occupied());

        let st = self.st_mut();
        st.key = key;
        st.non_pawn_material = npm;
        st.checkers_bb = checkers;

        self.set_check_info();
    }

    /// 王手検出用の事前計算（遮り駒・ピン・王手升・捉）
    pub(crate) fn set_check_info(&mut self) {
        let (blockers_w, pinners_b) =
            self.blockers_for(self.pieces_c(Color::Black), self.king_square(Color::White));
        let (blockers_b, pinners_w) =
            self.blockers_for(self.pieces_c(Color::White), self.king_square(Color::Black));

        let us = self.side_to_move;
        let ksq = self.king_square(!us);
        let occupied = self.occupied();

        let mut check_squares = [Bitboard::EMPTY; PieceType::NUM];
        check_squares[PieceType::Pawn.index()] = pawn_to_effect(us, ksq);
        check_squares[PieceType::Knight.index()] = knight_to_effect(ksq, occupied);
        check_squares[PieceType::Cannon.index()] = cannon_effect(ksq, occupied);
        check_squares[PieceType::Rook.index()] = rook_effect(ksq, occupied);
        // 士・象は敵陣に入れず、帥同士の対面はlegalが禁じるため、
        // これらの王手升は常に空。前提が崩れていないことだけ確かめる。
        debug_assert!(self
            .attackers_to(self.king_square(us))
            .iter()
            .all(|s| {
                let pc = self.piece_on(s);
                pc.color() == us
                    || !matches!(pc.piece_type(), PieceType::Advisor | PieceType::Bishop)
            }));

        {
            let st = self.st_mut();
            st.blockers_for_king = [blockers_w, blockers_b];
            st.pinners = [pinners_w, pinners_b];
            st.check_squares = check_squares;
        }

        let chased = self.chased();
        self.st_mut().chased = chased;
    }

    // =========================================================================
    // 指し手の適用と巻き戻し
    // =========================================================================

    /// 指し手を適用する
    ///
    /// `m` は合法であること。`gives_check` には `gives_check(m)` の結果を
    /// 渡す（探索側が計算済みの値を再利用できるようにするため）。
    pub fn do_move(&mut self, m: Move, gives_check: bool) {
        debug_assert!(m.is_ok());

        if let Some(nodes) = &self.nodes {
            nodes.add(1);
        }

        let mut key = self.st().key ^ zobrist_side();

        let mut new_st = StateInfo {
            non_pawn_material: self.st().non_pawn_material,
            plies_from_null: self.st().plies_from_null + 1,
            last_move: m,
            ..StateInfo::default()
        };
        self.game_ply += 1;

        new_st.accumulator.computed = [false, false];
        new_st.dirty_piece.dirty_num = 1;

        let us = self.side_to_move;
        let them = !us;
        let from = m.from_sq();
        let to = m.to_sq();
        let pc = self.piece_on(from);
        let captured = self.piece_on(to);

        debug_assert!(pc.is_some() && pc.color() == us, "do_move: bad mover {m}");
        debug_assert!(captured.is_none() || captured.color() == them);
        debug_assert!(captured.is_none() || captured.piece_type() != PieceType::King);

        if captured.is_some() {
            if captured.piece_type() != PieceType::Pawn {
                new_st.non_pawn_material[them.index()] -= captured.piece_type().mg_value();
            }

            new_st.dirty_piece.dirty_num = 2;
            new_st.dirty_piece.piece[1] = captured;
            new_st.dirty_piece.from[1] = Some(to);
            new_st.dirty_piece.to[1] = None;

            self.remove_piece(to);
            key ^= zobrist_psq(captured, to);
        }

        key ^= zobrist_psq(pc, from) ^ zobrist_psq(pc, to);

        new_st.dirty_piece.piece[0] = pc;
        new_st.dirty_piece.from[0] = Some(from);
        new_st.dirty_piece.to[0] = Some(to);

        self.move_piece(from, to);

        new_st.captured_piece = captured;
        new_st.key = key;
        new_st.checkers_bb = if gives_check {
            self.checkers_to(us, self.king_square(them), self.occupied())
        } else {
            Bitboard::EMPTY
        };

        self.side_to_move = them;
        self.states.push(new_st);
        self.set_check_info();

        debug_assert!(self.pos_is_ok());
    }

    /// 指し手を巻き戻す
    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(m.is_ok());
        debug_assert!(self.st().last_move == m);

        self.side_to_move = !self.side_to_move;

        let from = m.from_sq();
        let to = m.to_sq();
        debug_assert!(self.empty(from));

        self.move_piece(to, from);

        let captured = self.st().captured_piece;
        if captured.is_some() {
            self.put_piece(captured, to);
        }

        self.states.pop();
        self.game_ply -= 1;

        debug_assert!(self.pos_is_ok());
    }

    /// ヌルムーブ（手番のみ交代）を適用する
    ///
    /// 王手がかかっていないこと。更新後のキーで置換表のプリフェッチを
    /// 発行する。
    pub fn do_null_move(&mut self, tt: &impl TtPrefetch) {
        debug_assert!(!self.in_check());

        let mut new_st = self.st().clone();
        new_st.dirty_piece = Default::default();
        new_st.accumulator.computed = [false, false];
        new_st.key ^= zobrist_side();
        new_st.plies_from_null = 0;

        tt.prefetch(new_st.key);

        self.side_to_move = !self.side_to_move;
        self.states.push(new_st);
        self.set_check_info();

        debug_assert!(self.pos_is_ok());
    }

    /// ヌルムーブを巻き戻す
    pub fn undo_null_move(&mut self) {
        debug_assert!(!self.in_check());
        self.states.pop();
        self.side_to_move = !self.side_to_move;
    }

    /// 指し手適用後のZobristキーを盤面を変えずに求める（投機プリフェッチ用）
    pub fn key_after(&self, m: Move) -> Key {
        let from = m.from_sq();
        let to = m.to_sq();
        let pc = self.piece_on(from);
        let captured = self.piece_on(to);
        let mut key = self.st().key ^ zobrist_side();

        if captured.is_some() {
            key ^= zobrist_psq(captured, to);
        }
        key ^ zobrist_psq(pc, to) ^ zobrist_psq(pc, from)
    }

    // =========================================================================
    // 指し手の検査
    // =========================================================================

    /// pseudo-legalな指し手が合法かどうか
    ///
    /// 1. 対面（飛将）にならないこと
    /// 2. 玉を動かすなら移動先に敵の利きがないこと
    /// 3. それ以外は移動後に自玉へ王手が残らないこと
    ///    （移動先で取った駒の利きは除く）
    pub fn legal(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());

        let us = self.side_to_move;
        let from = m.from_sq();
        let to = m.to_sq();
        let occupied = (self.occupied() ^ from) | to;

        debug_assert!(self.moved_piece(m).color() == us);
        debug_assert!(
            self.piece_on(self.king_square(us)) == Piece::make(us, PieceType::King)
        );

        // 対面ルール
        let ksq = if self.moved_piece(m).piece_type() == PieceType::King {
            to
        } else {
            self.king_square(us)
        };
        if !(rook_effect(ksq, occupied) & self.pieces(!us, PieceType::King)).is_empty() {
            return false;
        }

        if self.piece_on(from).piece_type() == PieceType::King {
            return self.checkers_to(!us, to, occupied).is_empty();
        }

        (self.checkers_to(!us, self.king_square(us), occupied) & !Bitboard::from_square(to))
            .is_empty()
    }

    /// pseudo-legalチェック（置換表手の妥当性確認用）
    ///
    /// 置換表は並行書き込みで壊れた指し手を返しうるため、盤上の駒と
    /// 利きの範囲で指し手が成立するかだけを検査する。完全な合法性
    /// （自玉の王手回避）は `legal` で確認すること。
    pub fn pseudo_legal(&self, m: Move) -> bool {
        if !m.is_ok() || !m.is_valid() {
            return false;
        }

        let us = self.side_to_move;
        let from = m.from_sq();
        let to = m.to_sq();
        let pc = self.piece_on(from);

        // 移動元に自分の駒があるか
        if pc.is_none() || pc.color() != us {
            return false;
        }

        // 移動先に自分の駒がないか
        if self.pieces_c(us).contains(to) {
            return false;
        }

        // 駒の動きとして正しいか。砲の不取りは車と同じ滑り、取りは跳び。
        match pc.piece_type() {
            PieceType::Pawn => pawn_effect(us, from).contains(to),
            PieceType::Cannon if !self.is_capture(m) => {
                rook_effect(from, self.occupied()).contains(to)
            }
            pt => attacks_bb(pt, from, self.occupied()).contains(to),
        }
    }

    /// 指し手が敵玉に王手をかけるか
    pub fn gives_check(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        debug_assert!(self.moved_piece(m).color() == self.side_to_move);

        let us = self.side_to_move;
        let from = m.from_sq();
        let to = m.to_sq();
        let ksq = self.king_square(!us);
        let pt = self.moved_piece(m).piece_type();

        // 直接王手。砲は移動後の占有でスクリーンが変わるため再計算する。
        if pt == PieceType::Cannon {
            if cannon_effect(to, (self.occupied() ^ from) | to).contains(ksq) {
                return true;
            }
        } else if self.check_squares(pt).contains(to) {
            return true;
        }

        // 開き王手。自分の砲が敵玉と同じ線上にあるときは、移動で
        // スクリーンが増減して王手が生じたり消えたりする（単調でない）
        // ため全再計算する。
        if !(self.check_squares(PieceType::Rook) & self.pieces(us, PieceType::Cannon)).is_empty() {
            !self
                .checkers_to(us, ksq, (self.occupied() ^ from) | to)
                .is_empty()
        } else {
            self.blockers_for_king(!us).contains(from)
                && !crate::bitboard::aligned(from, to, ksq)
        }
    }

    // =========================================================================
    // その他
    // =========================================================================

    /// 紅黒を入れ替えた局面にする（対称性のデバッグ用）
    pub fn flip(&mut self) {
        let fen = self.fen();
        let mut tokens = fen.split(' ');
        let placement = tokens.next().expect("fen always has placement");
        let stm = tokens.next().expect("fen always has side to move");
        let rest: Vec<&str> = tokens.collect();

        let flipped: String = placement
            .split('/')
            .rev()
            .map(|rank| {
                rank.chars()
                    .map(|c| {
                        if c.is_ascii_lowercase() {
                            c.to_ascii_uppercase()
                        } else if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else {
                            c
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<String>>()
            .join("/");

        let new_fen = format!(
            "{} {} {}",
            flipped,
            if stm == "w" { "b" } else { "w" },
            rest.join(" ")
        );

        let nodes = self.nodes.clone();
        self.set(&new_fen, nodes).expect("flipped fen is valid");
        debug!("position flipped");
    }

    /// 局面の整合性検査（debug_assertから呼ぶ）
    ///
    /// 盤面配列・Bitboard・駒数・StateInfoの相互整合を全て検査する。
    /// 差分更新されたStateInfoはゼロから再構築した値と一致しなければ
    /// ならない。
    pub fn pos_is_ok(&self) -> bool {
        assert_eq!(self.count(Piece::W_KING), 1, "pos_is_ok: white king count");
        assert_eq!(self.count(Piece::B_KING), 1, "pos_is_ok: black king count");
        assert_eq!(
            self.piece_on(self.king_square(Color::White)),
            Piece::W_KING,
            "pos_is_ok: white king square"
        );
        assert_eq!(
            self.piece_on(self.king_square(Color::Black)),
            Piece::B_KING,
            "pos_is_ok: black king square"
        );

        // 手番でない側に王手がかかっていないこと
        assert!(
            self.checkers_to(
                self.side_to_move,
                self.king_square(!self.side_to_move),
                self.occupied()
            )
            .is_empty(),
            "pos_is_ok: side not to move is in check"
        );

        // 兵の領域
        for c in [Color::White, Color::Black] {
            assert!(
                (self.pieces(c, PieceType::Pawn) & !crate::bitboard::PAWN_AREA_BB[c.index()])
                    .is_empty(),
                "pos_is_ok: pawn outside its area"
            );
            assert!(self.count(Piece::make(c, PieceType::Pawn)) <= 5, "pos_is_ok: pawn count");
        }

        // Bitboardの整合
        assert!(
            (self.pieces_c(Color::White) & self.pieces_c(Color::Black)).is_empty(),
            "pos_is_ok: color bitboards overlap"
        );
        let mut type_union = Bitboard::EMPTY;
        for p1 in PieceType::ALL {
            for p2 in PieceType::ALL {
                assert!(
                    p1 == p2 || (self.pieces_pt(p1) & self.pieces_pt(p2)).is_empty(),
                    "pos_is_ok: type bitboards overlap"
                );
            }
            type_union |= self.pieces_pt(p1);
        }
        assert_eq!(type_union, self.occupied(), "pos_is_ok: type/color union mismatch");

        // 駒数
        for pc in Piece::ALL {
            assert_eq!(
                self.count(pc),
                self.pieces(pc.color(), pc.piece_type()).count(),
                "pos_is_ok: piece count vs bitboard"
            );
            assert_eq!(
                self.count(pc) as usize,
                self.board.iter().filter(|&&b| b == pc).count(),
                "pos_is_ok: piece count vs board"
            );
        }

        // StateInfoの再構築値と差分更新値の一致
        let mut rebuilt = self.clone();
        rebuilt.set_state();
        let a = rebuilt.st();
        let b = self.st();
        assert_eq!(a.key, b.key, "pos_is_ok: key");
        assert_eq!(a.non_pawn_material, b.non_pawn_material, "pos_is_ok: material");
        assert_eq!(a.checkers_bb, b.checkers_bb, "pos_is_ok: checkers");
        assert_eq!(a.blockers_for_king, b.blockers_for_king, "pos_is_ok: blockers");
        assert_eq!(a.pinners, b.pinners, "pos_is_ok: pinners");
        assert_eq!(a.check_squares, b.check_squares, "pos_is_ok: check squares");
        assert_eq!(a.chased, b.chased, "pos_is_ok: chased");

        true
    }
}

impl std::fmt::Display for Position {
    /// 盤面のASCII表現とFEN・キー・王手駒を出力する
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, " +---+---+---+---+---+---+---+---+---+")?;
        for rank in (0..10u8).rev() {
            for file in 0..9u8 {
                // SAFETY: rank*9+file < 90
                let sq = unsafe { Square::from_u8_unchecked(rank * 9 + file) };
                write!(f, " | {}", self.piece_on(sq).to_char())?;
            }
            writeln!(f, " | {rank}")?;
            writeln!(f, " +---+---+---+---+---+---+---+---+---+")?;
        }
        writeln!(f, "   a   b   c   d   e   f   g   h   i")?;
        writeln!(f)?;
        writeln!(f, "Fen: {}", self.fen())?;
        writeln!(f, "Key: {:016X}", self.key())?;
        write!(f, "Checkers:")?;
        for sq in self.checkers() {
            write!(f, " {sq}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::START_FEN;
    use crate::types::{File, Rank};

    fn sq(f: File, r: Rank) -> Square {
        Square::new(f, r)
    }

    fn pos_from(fen: &str) -> Position {
        let mut pos = Position::new();
        pos.set(fen, None).unwrap();
        pos
    }

    #[test]
    fn test_startpos_basics() {
        let pos = pos_from(START_FEN);
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.occupied().count(), 32);
        assert_eq!(pos.king_square(Color::White), sq(File::FileE, Rank::Rank0));
        assert_eq!(pos.king_square(Color::Black), sq(File::FileE, Rank::Rank9));
        assert!(pos.checkers().is_empty());
        assert_eq!(pos.key(), 0xFDA3_193C_470C_785C);
    }

    #[test]
    fn test_startpos_material() {
        let pos = pos_from(START_FEN);
        // 車2 馬2 象2 士2 砲2
        let expected = Value::new(2 * 1300 + 2 * 700 + 2 * 210 + 2 * 220 + 2 * 650);
        assert_eq!(pos.non_pawn_material(Color::White), expected);
        assert_eq!(pos.non_pawn_material(Color::Black), expected);
    }

    #[test]
    fn test_do_undo_roundtrip() {
        let mut pos = pos_from(START_FEN);
        let before_fen = pos.fen();
        let before_key = pos.key();

        let m = Move::from_uci("h2e2").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(pos.legal(m));
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        assert_eq!(pos.side_to_move(), Color::Black);
        assert_eq!(pos.game_ply(), 1);
        assert_ne!(pos.key(), before_key);

        pos.undo_move(m);
        assert_eq!(pos.fen(), before_fen);
        assert_eq!(pos.key(), before_key);
        assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn test_do_move_capture_restores() {
        // 車が渡河済みの黒兵を取り、巻き戻しで完全に復元される
        let mut pos = pos_from("4k4/9/9/9/4p3R/9/9/9/9/4K4 w - - 0 1");
        let before = pos.fen();
        let before_npm = pos.non_pawn_material(Color::Black);
        let capture = Move::from_uci("i5e5").unwrap();
        assert!(pos.pseudo_legal(capture));
        assert!(pos.is_capture(capture));
        let gc = pos.gives_check(capture);
        pos.do_move(capture, gc);
        assert_eq!(pos.count(Piece::B_PAWN), 0);
        assert_eq!(pos.captured_piece(), Piece::B_PAWN);
        // 兵は駒割りに入らない
        assert_eq!(pos.non_pawn_material(Color::Black), before_npm);
        pos.undo_move(capture);
        assert_eq!(pos.fen(), before);
        assert_eq!(pos.count(Piece::B_PAWN), 1);
    }

    #[test]
    fn test_key_after_matches_do_move() {
        let mut pos = pos_from(START_FEN);
        for uci in ["h2e2", "h9g7", "h0g2"] {
            let m = Move::from_uci(uci).unwrap();
            let predicted = pos.key_after(m);
            let gc = pos.gives_check(m);
            pos.do_move(m, gc);
            assert_eq!(pos.key(), predicted, "move {uci}");
        }
    }

    #[test]
    fn test_null_move_roundtrip() {
        use crate::prefetch::NoPrefetch;
        let mut pos = pos_from(START_FEN);
        let before_key = pos.key();
        pos.do_null_move(&NoPrefetch);
        assert_eq!(pos.side_to_move(), Color::Black);
        assert_eq!(pos.key(), before_key ^ super::zobrist_side());
        assert_eq!(pos.state().plies_from_null, 0);
        pos.undo_null_move();
        assert_eq!(pos.key(), before_key);
        assert_eq!(pos.side_to_move(), Color::White);
    }

    #[test]
    fn test_legal_flying_general_blocked_move() {
        // 両帥の間にある唯一の駒（砲）をどかす手は対面となり違法
        let pos = pos_from("4k4/9/9/9/9/9/9/4C4/9/4K4 w - - 0 1");
        let m = Move::from_uci("e2d2").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(!pos.legal(m), "moving the only blocker exposes the kings");
        // 同じ筋の上で動く分には合法
        let m = Move::from_uci("e2e5").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(pos.legal(m));
        // 帥がe筋から外れるのも合法
        let m = Move::from_uci("e0d0").unwrap();
        assert!(pos.legal(m));
    }

    #[test]
    fn test_legal_king_into_attack() {
        // 黒車がd9からd筋を睨んでいる。帥がd0に入るのは違法。
        let pos = pos_from("3rk4/9/9/9/9/4p4/9/9/9/4K4 w - - 0 1");
        let m = Move::from_uci("e0d0").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(!pos.legal(m));
        // e筋は黒兵e4が遮っているので前進は合法
        let m = Move::from_uci("e0e1").unwrap();
        assert!(pos.legal(m));
    }

    #[test]
    fn test_pseudo_legal_rejects_corrupted() {
        let pos = pos_from(START_FEN);
        // 盤外を指す生の16bit値
        let bad = Move::from_u16(0x7fff);
        assert!(!pos.pseudo_legal(bad));
        // 空の升から動く手
        let bad = Move::from_uci("e4e5").unwrap();
        assert!(!pos.pseudo_legal(bad));
        // 相手の駒を動かす手
        let bad = Move::from_uci("h9g7").unwrap();
        assert!(!pos.pseudo_legal(bad));
        // 自分の駒がいる升へ動く手
        let bad = Move::from_uci("a0a3").unwrap();
        assert!(!pos.pseudo_legal(bad));
    }

    #[test]
    fn test_gives_check_direct_rook() {
        // e筋は黒兵が遮っているので対面にはならない
        let pos = pos_from("4k4/9/9/9/9/4p4/9/9/9/R3K4 w - - 0 1");
        let to_check = Move::from_uci("a0a9").unwrap();
        assert!(pos.gives_check(to_check), "rook on rank 9 checks the king");
        let quiet = Move::from_uci("a0b0").unwrap();
        assert!(!pos.gives_check(quiet));
    }

    #[test]
    fn test_gives_check_cannon_screen() {
        // 砲h2がe2に回ると、黒兵e4をスクリーンに帥e9へ王手
        let pos = pos_from("4k4/9/9/9/9/4p4/9/7C1/9/4K4 w - - 0 1");
        let m = Move::from_uci("h2e2").unwrap();
        assert!(pos.legal(m));
        assert!(pos.gives_check(m), "cannon checks through the pawn screen");
        // h筋を上がるだけでは王手にならない（スクリーンがない）
        let m = Move::from_uci("h2h9").unwrap();
        assert!(!pos.gives_check(m));
    }

    #[test]
    fn test_gives_check_discovered() {
        // 帥e9、紅車e0、間に紅馬e5。馬がどくと車の王手が開く。
        let pos = pos_from("4k4/9/9/9/4N4/9/9/9/9/3KR4 w - - 0 1");
        let m = Move::from_uci("e5d7").unwrap();
        assert!(pos.legal(m));
        assert!(pos.gives_check(m), "knight move discovers rook check");
        // 別方向へ外れても開き王手
        let m2 = Move::from_uci("e5c4").unwrap();
        assert!(pos.gives_check(m2));
    }

    #[test]
    fn test_display_contains_fen_and_key() {
        let pos = pos_from(START_FEN);
        let s = pos.to_string();
        assert!(s.contains("Fen: "));
        assert!(s.contains("Key: FDA3193C470C785C"));
        assert!(s.contains("Checkers:"));
    }

    #[test]
    fn test_flip_involution() {
        let mut pos = pos_from(START_FEN);
        pos.flip();
        assert_eq!(pos.side_to_move(), Color::Black);
        pos.flip();
        assert_eq!(pos.fen(), START_FEN);
    }

    #[test]
    fn test_node_counter() {
        let counter = Arc::new(NodeCounter::new());
        let mut pos = Position::new();
        pos.set(START_FEN, Some(counter.clone())).unwrap();
        let m = Move::from_uci("h2e2").unwrap();
        let gc = pos.gives_check(m);
        pos.do_move(m, gc);
        pos.undo_move(m);
        assert_eq!(counter.get(), 1);
    }
}
