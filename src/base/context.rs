//! Ergonomic result-code helpers.
//!
//! Provides an extension trait converting raw engine return codes into
//! `Result`s carrying the engine's numeric code and message.

use crate::base::neterror::NetError;
use crate::sys;
use libc::{c_int, c_uint};

/// Extension trait for raw engine return codes.
pub trait EngineCodeExt {
    /// Treat the code as an easy-interface result.
    ///
    /// # Example
    /// ```ignore
    /// use curlnet::base::context::EngineCodeExt;
    ///
    /// unsafe { curl_sys::curl_easy_perform(raw) }.easy_result()?;
    /// // Error: "Transfer error 7: Couldn't connect to server"
    /// ```
    fn easy_result(self) -> Result<(), NetError>;

    /// Treat the code as a multi-interface result.
    fn multi_result(self) -> Result<(), NetError>;
}

// Engine result types are `c_uint` or `c_int` depending on the target.
macro_rules! impl_engine_code {
    ($($ty:ty),*) => {$(
        impl EngineCodeExt for $ty {
            fn easy_result(self) -> Result<(), NetError> {
                let code = self as i32;
                if code == sys::CURLE_OK {
                    Ok(())
                } else {
                    Err(NetError::transfer(code))
                }
            }

            fn multi_result(self) -> Result<(), NetError> {
                let code = self as i32;
                if code == sys::CURLM_OK {
                    Ok(())
                } else {
                    Err(NetError::scheduler(code))
                }
            }
        }
    )*};
}

impl_engine_code!(c_int, c_uint);
