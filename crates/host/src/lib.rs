//! unalias-host
//!
//! In-process frontend: a `cdylib` loaded next to the host binary that answers
//! `GetTrueName(name)` with the name the runtime library actually exports `name` under.
//!
//! Nothing runs at load time. The first call reads `unalias.json` from the working directory
//! (falling back to defaults), opens the log file, and builds the process-wide
//! [`HostContext`]; discovery itself runs lazily inside the resolver. On Windows, process
//! detach closes the log file.

use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use log::{info, warn};
use unalias_core::{load_config, LoadedModule, NameResolver, ResolverConfig};

/// Optional config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "unalias.json";
/// Log file used when the config does not name one.
pub const DEFAULT_LOG_FILE: &str = "unalias.log";

static CONTEXT: OnceLock<HostContext> = OnceLock::new();
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// A resolver plus C copies of every obfuscated name, so returned pointers outlive the call.
pub struct HostContext {
    resolver: NameResolver,
    c_names: OnceLock<HashMap<String, CString>>,
}

impl HostContext {
    pub fn new(resolver: NameResolver) -> Self {
        Self { resolver, c_names: OnceLock::new() }
    }

    /// Context resolving against the configured host module in this process.
    pub fn from_config(config: ResolverConfig) -> Self {
        let source = LoadedModule::new(config.host_module.clone());
        Self::new(NameResolver::new(config, Box::new(source)))
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// The obfuscated name for `name`, or `None` when `name` passes through unchanged.
    pub fn resolve_c(&self, name: &str) -> Option<&CStr> {
        let c_names = self.c_names.get_or_init(|| self.build_c_names());
        if !self.resolver.mapping().has_prefix(name) {
            return None;
        }
        c_names.get(name).map(CString::as_c_str)
    }

    fn build_c_names(&self) -> HashMap<String, CString> {
        let mut c_names = HashMap::new();
        for (true_name, alias) in self.resolver.mapping().entries() {
            match CString::new(alias) {
                Ok(alias) => {
                    c_names.insert(true_name.to_string(), alias);
                }
                Err(_) => warn!("Alias for {true_name} contains a NUL byte; it will pass through"),
            }
        }
        c_names
    }

    /// Translate a C string through this context.
    ///
    /// Returns `name` itself for null input, non-UTF-8 input and every passthrough; otherwise
    /// a pointer owned by the context.
    ///
    /// # Safety
    /// `name` must be null or point to a NUL-terminated string valid for the duration of the
    /// call.
    pub unsafe fn translate(&self, name: *const c_char) -> *const c_char {
        if name.is_null() {
            return name;
        }
        // SAFETY: non-null and NUL terminated per the caller contract.
        let text = unsafe { CStr::from_ptr(name) };
        let Ok(text) = text.to_str() else {
            return name;
        };
        match self.resolve_c(text) {
            Some(alias) => alias.as_ptr(),
            None => name,
        }
    }
}

/// Load `unalias.json` if present. A broken file is reported once logging is up.
fn load_host_config(path: &Path) -> (ResolverConfig, Option<String>) {
    if !path.is_file() {
        return (ResolverConfig::default(), None);
    }
    match load_config(path) {
        Ok(config) => (config, None),
        Err(err) => (ResolverConfig::default(), Some(format!("{err:#}"))),
    }
}

fn log_file() -> MutexGuard<'static, Option<File>> {
    LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Logger sink writing to [`LOG_FILE`]. Records written after the file is closed are dropped.
struct LogFileWriter;

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match log_file().as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match log_file().as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Open `path` as the log file, replacing any file opened before.
fn open_log_file(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    *log_file() = Some(file);
    Ok(())
}

/// Flush and close the log file. Returns whether one was open.
pub fn close_log_file() -> bool {
    let Some(mut file) = log_file().take() else {
        return false;
    };
    let _ = file.flush();
    true
}

fn init_file_logger(path: &Path) {
    if open_log_file(path).is_err() {
        return;
    }
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(LogFileWriter)))
        .try_init();
}

fn bootstrap() -> HostContext {
    let (config, problem) = load_host_config(Path::new(CONFIG_FILE));
    let log_file = config.log_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    init_file_logger(&log_file);
    if let Some(problem) = problem {
        warn!("Ignoring {CONFIG_FILE}, using defaults: {problem}");
    }
    info!(
        "unalias-host {} resolving {} names via module {}",
        unalias_core::version(),
        config.name_prefix,
        config.host_module
    );
    HostContext::from_config(config)
}

/// The process-wide context, created on first use.
pub fn context() -> &'static HostContext {
    CONTEXT.get_or_init(bootstrap)
}

/// C entry point: translate a true export name into the name the host exports it under.
///
/// # Safety
/// `name` must be null or point to a NUL-terminated string valid for the duration of the call.
/// A returned pointer other than `name` stays valid for the life of the process.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn GetTrueName(name: *const c_char) -> *const c_char {
    if name.is_null() {
        return name;
    }
    // SAFETY: forwarded caller contract.
    unsafe { context().translate(name) }
}

/// Loader entry point. Attach does nothing; detach closes the log file.
#[cfg(windows)]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(
    _module: *mut std::ffi::c_void,
    reason: u32,
    _reserved: *mut std::ffi::c_void,
) -> i32 {
    const DLL_PROCESS_DETACH: u32 = 0;
    if reason == DLL_PROCESS_DETACH {
        close_log_file();
    }
    1
}
