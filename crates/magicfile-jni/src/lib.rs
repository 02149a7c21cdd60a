//! JNI entry points for `nl.kb.magicfile.MagicFile`.
//!
//! The Java class declares six static natives, three taking a path string
//! and three taking a byte array. Each one converts its argument into an
//! owned Rust value, runs a [`Check`] through a shared [`Detector`] and
//! hands back a new Java string.
//!
//! Failures are raised as Java exceptions and the native returns `null`:
//! - `java.io.FileNotFoundException` for paths that cannot be read
//! - `java.io.IOException` for everything else (null or empty arrays,
//!   database load failures, classification failures)
//! - `java.lang.RuntimeException` if the Rust side panicked
//!
//! The signature database is taken from `MAGICFILE_DATABASE` when set.

use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;

use jni::objects::{JByteArray, JClass, JObject, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use magicfile_core::{Check, Detector, DetectorConfig};
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Environment variable selecting a signature database
const DATABASE_ENV: &str = "MAGICFILE_DATABASE";

const FILE_NOT_FOUND_EXCEPTION: &str = "java/io/FileNotFoundException";
const IO_EXCEPTION: &str = "java/io/IOException";
const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

#[derive(Error, Debug)]
enum BridgeError {
    #[error(transparent)]
    Detect(#[from] magicfile_core::Error),
    #[error("JNI call failed: {0}")]
    Jni(#[from] jni::errors::Error),
}

impl BridgeError {
    /// Java exception class to raise, `None` when the JVM already has one pending
    fn exception_class(&self) -> Option<&'static str> {
        match self {
            Self::Detect(magicfile_core::Error::FileNotFound { .. }) => {
                Some(FILE_NOT_FOUND_EXCEPTION)
            }
            Self::Jni(jni::errors::Error::JavaException) => None,
            _ => Some(IO_EXCEPTION),
        }
    }
}

fn detector() -> &'static Detector {
    static DETECTOR: OnceLock<Detector> = OnceLock::new();

    DETECTOR.get_or_init(|| {
        // The host may already have installed a subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();

        let config = match std::env::var_os(DATABASE_ENV) {
            Some(database) => DetectorConfig::new().database(database),
            None => DetectorConfig::new(),
        };
        debug!("Initialised detector with {:?}", config);
        Detector::with_config(config)
    })
}

/// Runs `body` and converts its outcome into a Java string or a pending exception
fn run<'local>(
    env: &mut JNIEnv<'local>,
    method: &str,
    body: impl FnOnce(&mut JNIEnv<'local>) -> Result<String, BridgeError>,
) -> jstring {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        body(&mut *env).and_then(|value| Ok(env.new_string(value)?))
    }));

    match outcome {
        Ok(Ok(value)) => value.into_raw(),
        Ok(Err(err)) => {
            debug!("{} failed: {}", method, err);
            if let Some(class) = err.exception_class() {
                throw(env, class, &err.to_string());
            }
            ptr::null_mut()
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Panic in {}: {}", method, message);
            throw(env, RUNTIME_EXCEPTION, &format!("{method} panicked: {message}"));
            ptr::null_mut()
        }
    }
}

fn throw(env: &mut JNIEnv<'_>, class: &str, message: &str) {
    if let Err(e) = env.throw_new(class, message) {
        error!("Failed to throw {}: {}", class, e);
    }
}

/// Rejects a null Java argument before anything is read from it
fn require_argument(argument: &JObject<'_>, what: &str) -> Result<(), BridgeError> {
    if argument.is_null() {
        return Err(magicfile_core::Error::invalid_input(format!("{what} is null")).into());
    }
    Ok(())
}

fn check_path<'local>(
    mut env: JNIEnv<'local>,
    method: &str,
    check: Check,
    path: JString<'local>,
) -> jstring {
    run(&mut env, method, |env| {
        require_argument(&path, "path")?;
        let path: String = env.get_string(&path)?.into();
        Ok(detector().detect_path(check, path)?)
    })
}

fn check_bytes<'local>(
    mut env: JNIEnv<'local>,
    method: &str,
    check: Check,
    bytes: JByteArray<'local>,
) -> jstring {
    run(&mut env, method, |env| {
        require_argument(&bytes, "byte array")?;
        // The copy lives until the end of this closure, whichever way it exits
        let data = env.convert_byte_array(&bytes)?;
        Ok(detector().detect_buffer(check, &data)?)
    })
}

/// `static native String checkText(String path)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkText<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    check_path(env, "checkText", Check::Text, path)
}

/// `static native String checkMime(String path)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkMime<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    check_path(env, "checkMime", Check::MimeType, path)
}

/// `static native String checkEncoding(String path)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkEncoding<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    check_path(env, "checkEncoding", Check::Encoding, path)
}

/// `static native String checkTextStream(byte[] buffer)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkTextStream<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    bytes: JByteArray<'local>,
) -> jstring {
    check_bytes(env, "checkTextStream", Check::Text, bytes)
}

/// `static native String checkMimeStream(byte[] buffer)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkMimeStream<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    bytes: JByteArray<'local>,
) -> jstring {
    check_bytes(env, "checkMimeStream", Check::MimeType, bytes)
}

/// `static native String checkEncodingStream(byte[] buffer)`
#[no_mangle]
pub extern "system" fn Java_nl_kb_magicfile_MagicFile_checkEncodingStream<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    bytes: JByteArray<'local>,
) -> jstring {
    check_bytes(env, "checkEncodingStream", Check::Encoding, bytes)
}
