//! 置換表プリフェッチのトレイト定義
//!
//! 探索中に次の局面の置換表エントリを事前にキャッシュへ読み込むことで、
//! メモリアクセスのレイテンシを隠蔽する。本クレートは置換表を持たない
//! ため、探索側が実装を差し込む。

/// 置換表のプリフェッチを行うトレイト
///
/// `do_null_move` は手番を反映した更新後のキーでこれを呼び出す。
pub trait TtPrefetch {
    /// 指定されたキーに対応する置換表エントリをプリフェッチする
    fn prefetch(&self, key: u64);
}

/// プリフェッチを行わないダミー実装
///
/// 置換表が無い用途（局面検証、棋譜再生、テストなど）で使用する。
pub struct NoPrefetch;

impl TtPrefetch for NoPrefetch {
    #[inline]
    fn prefetch(&self, _key: u64) {}
}
