//! FEN形式の解析と出力
//!
//! 配置は段9から段0、各段は筋aから筋i。駒文字は紅が `RACPNBK`、黒が
//! 小文字。3・4番目のフィールド（チェスのキャスリング・アンパッサン）
//! は `-` として出力し、解析時は読み飛ばす。
//!
//! 解析は壊れた入力に対して頑健ではない。正しいFENを渡すのはGUI側の
//! 責任で、ここでは構文上明らかな誤りだけを `FenError` で返す。

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::types::{Color, Piece, Rank, Square};

use super::{NodeCounter, Position, StateInfo};

/// 平手初期局面のFEN
pub const START_FEN: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

/// FEN解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("invalid piece or digit in placement: '{0}'")]
    InvalidPlacement(char),
    #[error("placement runs off the board")]
    PlacementOverflow,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid side to move: '{0}'")]
    InvalidSideToMove(String),
    #[error("invalid move counter: '{0}'")]
    InvalidCounter(String),
}

impl Position {
    /// FEN文字列から局面を設定する
    ///
    /// 状態スタックは初期状態1つに巻き戻される。`nodes` は探索スレッドの
    /// ノードカウンタで、`do_move` のたびに加算される。
    pub fn set(&mut self, fen: &str, nodes: Option<Arc<NodeCounter>>) -> Result<(), FenError> {
        self.clear();
        self.nodes = nodes;

        let mut tokens = fen.split_whitespace();

        // 1. 駒配置
        let placement = tokens.next().ok_or(FenError::MissingField("placement"))?;
        let mut sq = Square::new(crate::types::File::FileA, Rank::Rank9).index() as i32;
        for c in placement.chars() {
            if let Some(d) = c.to_digit(10) {
                if !(1..=9).contains(&d) {
                    return Err(FenError::InvalidPlacement(c));
                }
                sq += d as i32;
            } else if c == '/' {
                sq -= 2 * 9;
            } else if let Some(pc) = Piece::from_char(c) {
                let square =
                    Square::from_u8(u8::try_from(sq).map_err(|_| FenError::PlacementOverflow)?)
                        .ok_or(FenError::PlacementOverflow)?;
                self.put_piece(pc, square);
                sq += 1;
            } else {
                return Err(FenError::InvalidPlacement(c));
            }
            if sq > 91 || sq < -9 {
                return Err(FenError::PlacementOverflow);
            }
        }

        // 2. 手番
        let stm = tokens.next().ok_or(FenError::MissingField("side to move"))?;
        self.side_to_move = match stm {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidSideToMove(other.to_string())),
        };

        // 3-4. 未使用フィールド
        let _ = tokens.next();
        let _ = tokens.next();

        // 5-6. 手数カウンタ（省略可）
        let _halfmove = match tokens.next() {
            Some(t) => t.parse::<i32>().map_err(|_| FenError::InvalidCounter(t.to_string()))?,
            None => 0,
        };
        let fullmove = match tokens.next() {
            Some(t) => t.parse::<i32>().map_err(|_| FenError::InvalidCounter(t.to_string()))?,
            None => 1,
        };
        self.game_ply =
            (2 * (fullmove - 1)).max(0) + if self.side_to_move == Color::Black { 1 } else { 0 };

        self.states.push(StateInfo::default());
        self.set_state();

        debug_assert!(self.pos_is_ok());
        debug!("position set from fen: {}", self.fen());
        Ok(())
    }

    /// 平手初期局面を設定する
    pub fn set_startpos(&mut self, nodes: Option<Arc<NodeCounter>>) {
        self.set(START_FEN, nodes).expect("START_FEN is valid");
    }

    /// 現局面のFEN表現を返す
    pub fn fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..10).rev() {
            let mut empty_count = 0;
            for file in 0..9 {
                // SAFETY: rank*9+file < 90
                let sq = unsafe { Square::from_u8_unchecked((rank * 9 + file) as u8) };
                let pc = self.piece_on(sq);
                if pc.is_none() {
                    empty_count += 1;
                } else {
                    if empty_count > 0 {
                        out.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    out.push(pc.to_char());
                }
            }
            if empty_count > 0 {
                out.push_str(&empty_count.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }

        let black = self.side_to_move == Color::Black;
        out.push_str(if black { " b " } else { " w " });
        out.push_str("- - 0 ");
        out.push_str(&(1 + (self.game_ply - i32::from(black)) / 2).to_string());
        out
    }
}
