pub mod error;
pub mod generator;
pub mod json;
pub mod parser;
pub mod wav;

pub use error::{Error, ErrorInfo, ParseErrorKind};
pub use generator::{GeneratorConfig, SampleGenerator, Waveform};
pub use parser::{FileSource, InputSource, MemorySource, Note, Parser, StreamSource};
