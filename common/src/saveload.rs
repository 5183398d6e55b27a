use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Decode(String),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "io error: {}", e),
            LoadError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Decode(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// A serialization format that can encode and decode any serde type.
pub trait Encoder {
    const EXTENSION: &'static str;

    fn encode<T: Serialize>(x: &T) -> Result<Vec<u8>, LoadError>;
    fn decode<T: DeserializeOwned>(x: &[u8]) -> Result<T, LoadError>;
}

pub struct JSON;

impl Encoder for JSON {
    const EXTENSION: &'static str = "json";

    fn encode<T: Serialize>(x: &T) -> Result<Vec<u8>, LoadError> {
        serde_json::to_vec(x).map_err(|e| LoadError::Decode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(x: &[u8]) -> Result<T, LoadError> {
        serde_json::from_slice(x).map_err(|e| LoadError::Decode(e.to_string()))
    }
}

pub struct JSONPretty;

impl Encoder for JSONPretty {
    const EXTENSION: &'static str = "json";

    fn encode<T: Serialize>(x: &T) -> Result<Vec<u8>, LoadError> {
        serde_json::to_vec_pretty(x).map_err(|e| LoadError::Decode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(x: &[u8]) -> Result<T, LoadError> {
        JSON::decode(x)
    }
}

pub fn load_raw(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let mut buf = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Loads and decodes a file, logging the outcome.
pub fn load<E: Encoder, T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, LoadError> {
    let path = path.as_ref();
    let v = load_raw(path).and_then(|x| E::decode(&x));
    match v {
        Ok(_) => log::info!("successfully loaded {}", path.display()),
        Err(ref e) => log::error!("couldn't load {}: {}", path.display(), e),
    }
    v
}

pub fn save<E: Encoder, T: Serialize>(x: &T, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    let bytes = E::encode(x)?;
    std::fs::write(path, bytes)?;
    log::info!("successfully saved {}", path.display());
    Ok(())
}
