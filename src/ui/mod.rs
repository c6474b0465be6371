//! Terminal output for the CLI
//!
//! Interactive terminals get `cliclack` log lines, spinners and an
//! `indicatif` progress bar; CI and piped runs get plain `[OK]`/`[WARN]`
//! lines. A quiet context prints no status at all, which keeps stdout clean
//! for `--format json`.
//!
//! ```rust,ignore
//! use typeload::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Resolving clsx...");
//! spinner.stop("Loaded clsx");
//! ui::step_warn_hint(&ctx, "zod failed", "Run with -v for details");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, step_error, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{LoadProgress, TaskSpinner};
pub use prompts::confirm;
