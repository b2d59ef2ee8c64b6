//! 歌词格式转换：解析、生成与文本预处理。

pub mod generators;
pub mod parsers;
pub mod processors;
