//! 시세 조회를 위한 도메인 모델.

mod quote;

pub use quote::*;
