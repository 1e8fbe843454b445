//! 局面のJSON表現への変換（フロントエンド連携用）

use crate::types::json::{BoardStateJson, CellJson, PieceJson};
use crate::types::{Color, Square};

use super::Position;

impl Position {
    /// 盤面全体をJSON DTOへ変換する
    pub fn to_board_json(&self) -> BoardStateJson {
        let mut cells = Vec::with_capacity(10);
        for rank in (0..10u8).rev() {
            let mut row = Vec::with_capacity(9);
            for file in 0..9u8 {
                // SAFETY: rank*9+file < 90
                let sq = unsafe { Square::from_u8_unchecked(rank * 9 + file) };
                let pc = self.piece_on(sq);
                let piece = if pc.is_some() {
                    Some(PieceJson {
                        owner: match pc.color() {
                            Color::White => "white".to_string(),
                            Color::Black => "black".to_string(),
                        },
                        piece_type: pc.to_char().to_ascii_uppercase().to_string(),
                    })
                } else {
                    None
                };
                row.push(CellJson { square: sq.to_string(), piece });
            }
            cells.push(row);
        }

        BoardStateJson {
            cells,
            turn: match self.side_to_move() {
                Color::White => "white".to_string(),
                Color::Black => "black".to_string(),
            },
            ply: Some(self.game_ply()),
            fen: self.fen(),
        }
    }
}
