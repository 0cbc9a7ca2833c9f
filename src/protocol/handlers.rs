//! Command handlers module for the RAX share server.
//!
//! Applies the authentication guard and runs each command against the
//! session state, the user store and the server root. Handlers that stream
//! a body (LIST, GET) write it directly; everything else is returned as a
//! `CommandResult` for the session loop to send.

use log::{info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth;
use crate::client::Client;
use crate::error::handlers::log_storage_failure;
use crate::error::{ProtocolError, StorageError};
use crate::protocol::responses::{
    self, ALREADY_AUTHENTICATED, AUTH_FAILED, AUTH_SUCCESS, CANNOT_SAVE, DELETE_FAILED, GOODBYE,
    MISSING_FILENAME, NO_DELETE_TARGET, NOT_AUTHENTICATED, SENTINEL, USAGE,
};
use crate::protocol::{Command, CommandResult};
use crate::server::ServerContext;
use crate::storage::{delete_file, list_directory, resolve_file_path};
use crate::transfer::{flush_within, receive_file, send_file, write_all_within};

/// Dispatches a received command to its handler.
///
/// # Arguments
///
/// * `client` - State of the session that sent the command.
/// * `command` - The parsed command.
/// * `reader` - Control connection input, consumed by PUT.
/// * `writer` - Control connection output, written by LIST and GET.
/// * `ctx` - Shared server state.
///
/// # Returns
///
/// * `Ok(CommandResult)` - The outcome and the status line still to send.
/// * `Err(ProtocolError)` - The connection failed; the session must end.
pub async fn handle_command<R, W>(
    client: &mut Client,
    command: &Command,
    reader: &mut R,
    writer: &mut W,
    ctx: &ServerContext,
) -> Result<CommandResult, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if command.requires_auth() && !client.is_authenticated() {
        return Ok(CommandResult::failure("Not authenticated", NOT_AUTHENTICATED));
    }

    match command {
        Command::User { username, password } => {
            Ok(handle_cmd_user(client, username, password, ctx))
        }
        Command::List => handle_cmd_list(writer, ctx).await,
        Command::Get(filename) => handle_cmd_get(client, filename, writer, ctx).await,
        Command::Put(filename) => handle_cmd_put(client, filename, reader, ctx).await,
        Command::Del(filename) => Ok(handle_cmd_del(client, filename, ctx).await),
        Command::Quit => Ok(handle_cmd_quit(client)),
        Command::Unknown(_) => Ok(handle_cmd_unknown()),
    }
}

/// Handles USER: checks the pair once; a second USER is refused without a check.
fn handle_cmd_user(
    client: &mut Client,
    username: &str,
    password: &str,
    ctx: &ServerContext,
) -> CommandResult {
    if client.is_authenticated() {
        return CommandResult::failure("Already authenticated", ALREADY_AUTHENTICATED);
    }

    match auth::authenticate(&ctx.users, username, password) {
        Ok(()) => {
            client.authenticate(username);
            info!("Client {} authenticated as {}", client.client_addr(), username);
            CommandResult::success(AUTH_SUCCESS)
        }
        Err(e) => {
            warn!("Client {} failed to authenticate: {}", client.client_addr(), e);
            CommandResult::failure(e.to_string(), AUTH_FAILED)
        }
    }
}

/// Handles LIST: one `<name> <size>` line per entry, then the sentinel.
async fn handle_cmd_list<W>(writer: &mut W, ctx: &ServerContext) -> Result<CommandResult, ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let io_timeout = ctx.limits.io_timeout;

    // An unreadable root still yields a terminated (empty) listing.
    let entries = list_directory(&ctx.root).await.unwrap_or_default();
    for entry in &entries {
        let line = responses::list_entry(&entry.name, entry.size);
        write_all_within(writer, line.as_bytes(), io_timeout).await?;
    }
    write_all_within(writer, SENTINEL, io_timeout).await?;
    flush_within(writer, io_timeout).await?;

    Ok(CommandResult::streamed())
}

/// Handles GET: streams the file and the sentinel, or answers 404.
async fn handle_cmd_get<W>(
    client: &Client,
    filename: &str,
    writer: &mut W,
    ctx: &ServerContext,
) -> Result<CommandResult, ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if filename.is_empty() {
        return Ok(CommandResult::failure("Missing filename", MISSING_FILENAME));
    }

    let path = match resolve_file_path(&ctx.root, filename, ctx.confine_paths) {
        Ok(path) => path,
        Err(e) => {
            log_storage_failure(client.client_addr(), "GET", &e);
            return Ok(CommandResult::failure(
                e.to_string(),
                responses::file_not_found(filename),
            ));
        }
    };

    let _guard = ctx.locks.read(&path).await;
    match send_file(writer, &path, ctx.limits.buffer_size, ctx.limits.io_timeout).await {
        Ok(_) => Ok(CommandResult::streamed()),
        Err(e) if e.is_recoverable() => {
            info!("GET {} for {}: {}", filename, client.client_addr(), e);
            Ok(CommandResult::failure(
                e.to_string(),
                responses::file_not_found(filename),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Handles PUT: receives chunks until a lone sentinel, then reports the byte count.
async fn handle_cmd_put<R>(
    client: &Client,
    filename: &str,
    reader: &mut R,
    ctx: &ServerContext,
) -> Result<CommandResult, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let path = match resolve_file_path(&ctx.root, filename, ctx.confine_paths) {
        Ok(path) => path,
        Err(e) => {
            log_storage_failure(client.client_addr(), "PUT", &e);
            return Ok(CommandResult::failure(e.to_string(), CANNOT_SAVE));
        }
    };

    let _guard = ctx.locks.write(&path).await;
    match receive_file(reader, &path, ctx.limits.buffer_size, ctx.limits.io_timeout).await {
        Ok(bytes) => Ok(CommandResult::success(responses::file_saved(bytes, filename))),
        Err(e) if e.is_recoverable() => {
            warn!("PUT {} for {}: {}", filename, client.client_addr(), e);
            Ok(CommandResult::failure(e.to_string(), CANNOT_SAVE))
        }
        Err(e) => Err(e.into()),
    }
}

/// Handles DEL: checks existence, then removes the file.
async fn handle_cmd_del(client: &Client, filename: &str, ctx: &ServerContext) -> CommandResult {
    let path = match resolve_file_path(&ctx.root, filename, ctx.confine_paths) {
        Ok(path) => path,
        Err(StorageError::EmptyFilename) => {
            return CommandResult::failure("Missing filename", NO_DELETE_TARGET);
        }
        Err(e) => {
            log_storage_failure(client.client_addr(), "DEL", &e);
            return CommandResult::failure(e.to_string(), responses::file_not_on_server(filename));
        }
    };

    let _guard = ctx.locks.write(&path).await;
    match delete_file(&path, filename).await {
        Ok(()) => CommandResult::success(responses::file_deleted(filename)),
        Err(e @ StorageError::FileNotFound(_)) => {
            log_storage_failure(client.client_addr(), "DEL", &e);
            CommandResult::failure(e.to_string(), responses::file_not_on_server(filename))
        }
        Err(e) => {
            log_storage_failure(client.client_addr(), "DEL", &e);
            CommandResult::failure(e.to_string(), DELETE_FAILED)
        }
    }
}

/// Handles QUIT: closes the session after the farewell.
fn handle_cmd_quit(client: &mut Client) -> CommandResult {
    client.close();
    CommandResult::close(GOODBYE)
}

fn handle_cmd_unknown() -> CommandResult {
    CommandResult::failure("Unknown command", USAGE)
}
