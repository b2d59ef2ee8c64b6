//! 打轴前的文本处理。

pub mod syllablizer;
pub mod text_normalizer;
