pub mod ass_generator;
