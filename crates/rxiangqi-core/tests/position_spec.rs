//! 局面コアの結合テスト
//!
//! 初期局面の既知定数、対面ルール、砲のスクリーン、長将・長捉の検出、
//! SEEの符号、および make/unmake・FEN の往復性を通しで検査する。

use rxiangqi_core::{Color, Move, PieceType, Position, Square, Value, START_FEN};

fn pos_from(fen: &str) -> Position {
    let mut pos = Position::new();
    pos.set(fen, None).unwrap();
    pos
}

fn play(pos: &mut Position, uci: &str) {
    let m = Move::from_uci(uci).unwrap();
    assert!(pos.pseudo_legal(m), "not pseudo-legal: {uci}\n{pos}");
    assert!(pos.legal(m), "not legal: {uci}\n{pos}");
    let gives_check = pos.gives_check(m);
    pos.do_move(m, gives_check);
}

#[test]
fn initial_position_constants() {
    let pos = pos_from(START_FEN);
    assert_eq!(pos.side_to_move(), Color::White);
    assert_eq!(pos.game_ply(), 0);
    assert_eq!(pos.key(), 0xFDA3_193C_470C_785C);
    assert!(pos.checkers().is_empty());

    let m = Move::from_uci("e3e4").unwrap();
    assert!(pos.pseudo_legal(m));
    assert!(pos.legal(m));
}

#[test]
fn flying_general_restricts_moves() {
    // e筋が両帥の間で空いている。空けたままにする手は全て違法。
    let pos = pos_from("4k4/9/9/9/9/R8/9/9/9/4K4 w - - 0 1");
    let keeps_open = Move::from_uci("a4a5").unwrap();
    assert!(pos.pseudo_legal(keeps_open));
    assert!(!pos.legal(keeps_open), "leaving the file open must be illegal");

    // e筋に合駒する手と、帥がe筋から外れる手は合法
    let interpose = Move::from_uci("a4e4").unwrap();
    assert!(pos.legal(interpose));
    let king_steps_aside = Move::from_uci("e0d0").unwrap();
    assert!(pos.legal(king_steps_aside));
}

#[test]
fn cannon_screen_semantics() {
    // 砲h2、スクリーン黒兵h5、黒車h9
    let pos = pos_from("4k2r1/9/9/9/7p1/9/4P4/7C1/9/4K4 w - - 0 1");

    // スクリーン越しの車取りは合法
    let capture = Move::from_uci("h2h9").unwrap();
    assert!(pos.pseudo_legal(capture));
    assert!(pos.legal(capture));

    // 不取りの移動は車と同じ滑りなので、スクリーンの先h7へは行けない
    let past_screen = Move::from_uci("h2h7").unwrap();
    assert!(!pos.pseudo_legal(past_screen));

    // スクリーンの手前h4へは行ける
    let before_screen = Move::from_uci("h2h4").unwrap();
    assert!(pos.pseudo_legal(before_screen));
    assert!(pos.legal(before_screen));

    // スクリーンそのものは取れない（間に駒が無い）
    let onto_screen = Move::from_uci("h2h5").unwrap();
    assert!(!pos.pseudo_legal(onto_screen));
}

#[test]
fn perpetual_check_classified_as_loss() {
    // 黒車が4手サイクルで王手を続け、12手で根の局面が2回再現される
    let mut pos = pos_from("4k4/9/9/9/9/9/4p4/9/r8/3K5 b - - 0 1");
    for _ in 0..3 {
        play(&mut pos, "a1d1"); // 王手
        play(&mut pos, "d0e0");
        play(&mut pos, "d1e1"); // 王手
        play(&mut pos, "e0d0");
    }
    // 探索根(ply=0)でも2回目の再現として検出される
    let result = pos.is_repeated(0);
    assert!(result.is_some(), "perpetual check should be detected\n{pos}");
    // 王手を続けた黒（手番側）の負け
    assert_eq!(result.unwrap(), Value::mated_in(0));
}

#[test]
fn perpetual_chase_classified_as_loss() {
    // 黒馬が守られていない紅車を王手なしで追い回す
    let mut pos = pos_from("3k5/9/9/9/R1p6/9/9/1n7/9/4K4 b - - 0 1");
    for _ in 0..3 {
        play(&mut pos, "b2c4"); // 車a5に当てる
        play(&mut pos, "a5a4");
        play(&mut pos, "c4b2"); // 車a4に当てる
        play(&mut pos, "a4a5");
    }
    let result = pos.is_repeated(0);
    assert!(result.is_some(), "perpetual chase should be detected\n{pos}");
    // 追った黒（手番側）の負け
    assert_eq!(result.unwrap(), Value::mated_in(0));
}

#[test]
fn see_ordering_rook_takes_defended_pawn() {
    // 兵に守られた渡河兵を車で取る: 0以上にはならないが、
    // 車と兵の交換値を閾値にすれば成立する
    let pos = pos_from("4k4/9/9/9/9/3pp4/9/9/4R4/4K4 w - - 0 1");
    let m = Move::from_uci("e1e4").unwrap();
    assert!(!pos.see_ge(m, Value::ZERO));
    let rook = PieceType::Rook.mg_value().raw();
    let pawn = PieceType::Pawn.mg_value().raw();
    assert!(pos.see_ge(m, Value::new(pawn - rook)));
}

#[test]
fn make_unmake_restores_everything() {
    let mut pos = pos_from(START_FEN);
    let mut fens = vec![pos.fen()];
    let mut keys = vec![pos.key()];

    let line = ["h2e2", "h9g7", "h0g2", "i9h9", "i0h0", "b9c7", "h0h6", "b7a7"];
    for uci in line {
        play(&mut pos, uci);
        fens.push(pos.fen());
        keys.push(pos.key());

        // FEN往復: 同じ局面を読み直すと同じキーになる
        let reread = pos_from(&pos.fen());
        assert_eq!(reread.key(), pos.key(), "after {uci}");
        assert_eq!(reread.fen(), pos.fen(), "after {uci}");
    }

    // 全て巻き戻すと各局面がビット単位で復元される
    for uci in line.iter().rev() {
        let m = Move::from_uci(uci).unwrap();
        pos.undo_move(m);
        fens.pop();
        keys.pop();
        assert_eq!(pos.fen(), *fens.last().unwrap(), "undo {uci}");
        assert_eq!(pos.key(), *keys.last().unwrap(), "undo {uci}");
    }
    assert_eq!(pos.fen(), START_FEN);
    assert_eq!(pos.game_ply(), 0);
}

#[test]
fn flip_is_an_involution() {
    for fen in [
        START_FEN,
        "4k2r1/9/9/9/7p1/9/4P4/7C1/9/4K4 w - - 0 1",
        "3k5/9/9/9/R1p6/9/9/1n7/9/4K4 b - - 0 1",
    ] {
        let mut pos = pos_from(fen);
        let original = pos.fen();
        pos.flip();
        pos.flip();
        assert_eq!(pos.fen(), original, "flip twice must restore {fen}");
    }
}

#[test]
fn key_after_predicts_next_key() {
    let mut pos = pos_from(START_FEN);
    for uci in ["b2e2", "b9c7", "b0c2", "a9b9"] {
        let m = Move::from_uci(uci).unwrap();
        let predicted = pos.key_after(m);
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        assert_eq!(pos.key(), predicted, "key_after mismatch on {uci}");
    }
}

#[test]
fn board_display_lists_checkers() {
    // 黒車d1が紅帥d0に王手している局面
    let mut pos = pos_from("4k4/9/9/9/9/9/4p4/9/r8/3K5 b - - 0 1");
    play(&mut pos, "a1d1");
    assert!(pos.in_check());
    let rendered = pos.to_string();
    assert!(rendered.contains("Checkers: d1"), "got:\n{rendered}");
    assert_eq!(
        pos.checkers().lsb().map(|s| s.to_string()),
        Some("d1".to_string())
    );
}

#[test]
fn state_exposes_dirty_pieces_for_eval() {
    let mut pos = pos_from(START_FEN);
    let m = Move::from_uci("h2e2").unwrap();
    let gives_check = pos.gives_check(m);
    pos.do_move(m, gives_check);

    let st = pos.state();
    assert_eq!(st.dirty_piece.dirty_num, 1);
    assert_eq!(st.dirty_piece.from[0].map(|s: Square| s.to_string()), Some("h2".into()));
    assert_eq!(st.dirty_piece.to[0].map(|s: Square| s.to_string()), Some("e2".into()));
    assert!(!st.accumulator.computed[0] && !st.accumulator.computed[1]);
}
