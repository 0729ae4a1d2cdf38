use std::process::Command;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

use crate::error::AppError;
use crate::models::context::{WindowContext, UNKNOWN};

pub const DEFAULT_APP_TOKEN: &str = "Screenshot";

/// Reports the foreground window. Implementations never fail; they fall back
/// to `WindowContext::unknown()`.
pub trait ContextProvider: Send + Sync {
    fn active_window(&self) -> WindowContext;
}

pub struct NullContextProvider;

impl ContextProvider for NullContextProvider {
    fn active_window(&self) -> WindowContext {
        WindowContext::unknown()
    }
}

fn run_tool(program: &str, args: &[&str]) -> Result<String, AppError> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(AppError::Context(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn tool_available(program: &str, probe: &[&str]) -> bool {
    Command::new(program)
        .args(probe)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Last ` - ` separated segment of a title, e.g. `"notes.txt - Notepad"` -> `"Notepad"`.
fn app_from_title(title: &str) -> Option<String> {
    let app = title.rsplit(" - ").next()?.trim();
    if app.is_empty() {
        None
    } else {
        Some(app.to_string())
    }
}

fn process_name(pid: u32) -> Option<String> {
    let mut system = System::new();
    let pid = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    system
        .process(pid)
        .map(|p| p.name().to_string_lossy().to_string())
}

/// X11 foreground window via `xdotool`.
pub struct XdotoolContextProvider;

impl XdotoolContextProvider {
    fn query(&self) -> Result<WindowContext, AppError> {
        let title = run_tool("xdotool", &["getactivewindow", "getwindowname"])?;
        let app = run_tool("xdotool", &["getactivewindow", "getwindowpid"])
            .ok()
            .and_then(|pid| pid.parse::<u32>().ok())
            .and_then(process_name)
            .or_else(|| app_from_title(&title))
            .unwrap_or_else(|| UNKNOWN.to_string());
        Ok(WindowContext { title, app })
    }
}

impl ContextProvider for XdotoolContextProvider {
    fn active_window(&self) -> WindowContext {
        self.query().unwrap_or_else(|e| {
            debug!("active window lookup failed: {e}");
            WindowContext::unknown()
        })
    }
}

const FRONTMOST_SCRIPT: &str = r#"tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appName to name of frontApp
    set windowTitle to ""
    try
        set windowTitle to name of front window of frontApp
    end try
end tell
return appName & linefeed & windowTitle"#;

/// macOS foreground window via `osascript`.
pub struct AppleScriptContextProvider;

impl AppleScriptContextProvider {
    fn query(&self) -> Result<WindowContext, AppError> {
        let raw = run_tool("osascript", &["-e", FRONTMOST_SCRIPT])?;
        let mut lines = raw.lines();
        let app = lines.next().map(str::trim).unwrap_or_default();
        let title = lines.next().map(str::trim).unwrap_or_default();
        Ok(WindowContext {
            title: if title.is_empty() { UNKNOWN } else { title }.to_string(),
            app: if app.is_empty() { UNKNOWN } else { app }.to_string(),
        })
    }
}

impl ContextProvider for AppleScriptContextProvider {
    fn active_window(&self) -> WindowContext {
        self.query().unwrap_or_else(|e| {
            debug!("active window lookup failed: {e}");
            WindowContext::unknown()
        })
    }
}

/// Picks the provider for this platform once; falls back to the null provider
/// when the helper tool is missing.
pub fn detect_provider() -> Box<dyn ContextProvider> {
    if cfg!(target_os = "macos") && tool_available("osascript", &["-e", "return 1"]) {
        return Box::new(AppleScriptContextProvider);
    }
    if cfg!(all(unix, not(target_os = "macos"))) && tool_available("xdotool", &["version"]) {
        return Box::new(XdotoolContextProvider);
    }
    debug!("no active window helper found, context disabled");
    Box::new(NullContextProvider)
}

/// Short title-cased app token used at the front of generated filenames.
pub fn simplified_app_name(context: &WindowContext) -> String {
    let mut app = context.app.trim().to_string();

    if app.to_ascii_lowercase().ends_with(".exe") {
        app.truncate(app.len() - ".exe".len());
    }

    let cleaned: String = app
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let first = cleaned
        .split(|c: char| c.is_whitespace() || c == '.')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();

    if first.is_empty() {
        return DEFAULT_APP_TOKEN.to_string();
    }
    title_case(first)
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_word_start = true;
    for c in word.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
