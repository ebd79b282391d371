//! Shared helpers for CLI commands.

use clap::ValueEnum;
use dialoguer::{Input, Select};
use spriteforge::{Credentials, UploadTarget, Uploader};

use crate::error::CliError;

/// Creator kind selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    /// Upload on behalf of a group.
    Group,
    /// Upload on behalf of a user account.
    User,
}

/// Resolve the upload identity from flags, environment, or prompts.
///
/// Precedence: explicit `--target`/`--id` flags, then a single
/// `GROUP_ID`/`USER_ID` environment default, then interactive prompts.
/// Passing either flag disables the environment default entirely; the
/// missing piece is prompted for, or rejected in non-interactive mode.
/// A stray `GROUP_ID`/`USER_ID` never overrides an explicit flag.
pub fn resolve_target(
    kind: Option<TargetKind>,
    id: Option<String>,
    interactive: bool,
) -> Result<UploadTarget, CliError> {
    resolve_with_default(kind, id, UploadTarget::from_env(), interactive)
}

fn resolve_with_default(
    kind: Option<TargetKind>,
    id: Option<String>,
    env_default: Option<UploadTarget>,
    interactive: bool,
) -> Result<UploadTarget, CliError> {
    if kind.is_none() && id.is_none() {
        if let Some(target) = env_default {
            return Ok(target);
        }
    }

    let kind = match kind {
        Some(kind) => kind,
        None if interactive => {
            let choice = Select::new()
                .with_prompt("Upload from a Group or your own account?")
                .items(&["Group", "User"])
                .default(1)
                .interact()?;
            if choice == 0 {
                TargetKind::Group
            } else {
                TargetKind::User
            }
        }
        None => return Err(CliError::NoUploadTarget),
    };

    let id = match id {
        Some(id) => id,
        None if interactive => Input::<String>::new()
            .with_prompt(match kind {
                TargetKind::Group => "Group ID",
                TargetKind::User => "User ID",
            })
            .interact_text()?,
        None => return Err(CliError::NoUploadTarget),
    };

    Ok(match kind {
        TargetKind::Group => UploadTarget::Group(id),
        TargetKind::User => UploadTarget::User(id),
    })
}

/// Build an uploader from environment credentials.
pub fn build_uploader() -> Result<Uploader, CliError> {
    let credentials = Credentials::from_env()?;
    let api = spriteforge::RobloxApi::new(credentials)?;
    Ok(Uploader::new(std::sync::Arc::new(api)))
}
