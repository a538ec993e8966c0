// Diff scripts: literal/copy op sequences and their text payload.

pub mod script;

pub use script::{
    ApplyError, DiffOp, DiffScript, PayloadError, full_content_payload, quote,
};
