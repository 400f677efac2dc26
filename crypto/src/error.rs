use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{0}`")]
    HexError(#[from] hex::FromHexError),
    #[error("`{0}`")]
    KeyError(#[from] p256::pkcs8::spki::Error),
    #[error("`{0}`")]
    DerError(#[from] p256::pkcs8::der::Error),
    #[error("`{0}`")]
    CurveError(#[from] p256::elliptic_curve::Error),
    #[error("`{0}`")]
    SignatureError(#[from] p256::ecdsa::Error),
}
