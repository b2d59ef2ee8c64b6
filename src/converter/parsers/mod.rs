pub mod ass_parser;
