use serde::{Deserialize, Serialize};
use std::fmt;

/// Dataset split a frame or camera belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        };
        f.write_str(name)
    }
}
