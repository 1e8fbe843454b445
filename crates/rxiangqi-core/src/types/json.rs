use serde::{Deserialize, Serialize};

/// フロントエンド側で扱う駒のJSON表現
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PieceJson {
    /// "white" | "black"
    pub owner: String,
    /// "R" | "A" | "C" | "P" | "N" | "B" | "K"
    #[serde(rename = "type")]
    pub piece_type: String,
}

/// 盤面の1升
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellJson {
    /// "a0" ~ "i9" 形式
    pub square: String,
    /// 駒（存在しない場合はnull）
    pub piece: Option<PieceJson>,
}

/// 盤面全体の状態
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardStateJson {
    /// 10x9のセル配列（段9〜段0、各段は筋a〜筋i）
    pub cells: Vec<Vec<CellJson>>,
    /// 手番: "white" | "black"
    pub turn: String,
    /// 手数（省略可）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ply: Option<i32>,
    /// FEN文字列
    pub fen: String,
}
