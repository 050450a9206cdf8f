use std::fmt::Display;

#[derive(Debug)]
pub enum Error {
    PathNotFound,
    NotADirectory,
    NotAFile,
    AlreadyExists,
    NotEmpty,
    NameTooLong,
    FileTooLarge,
    NoSpace,
    NoInodes,
    Corruption,
    Io(std::io::Error),
    Utf8(std::str::Utf8Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathNotFound => write!(f, "path not found"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::NotAFile => write!(f, "not a file"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::NameTooLong => write!(f, "name too long"),
            Self::FileTooLarge => write!(f, "file too large"),
            Self::NoSpace => write!(f, "no space left on image"),
            Self::NoInodes => write!(f, "no free inodes"),
            Self::Corruption => write!(f, "image corruption detected"),
            Self::Io(e) => write!(f, "{e}"),
            Self::Utf8(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf8(value)
    }
}
