//! Wire responses
//!
//! Every string the server sends lives here. Lines end in a bare `\n`.

/// Status codes used at the start of status lines
pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const TOO_MANY_CONNECTIONS_CODE: u16 = 421;
pub const COMMAND_TOO_LONG_CODE: u16 = 500;

/// Marks the end of a LIST or GET body, and of a PUT upload.
pub const SENTINEL: &[u8] = b".\n";

pub const AUTH_SUCCESS: &str = "200 User authenticated.\n";
pub const AUTH_FAILED: &str = "400 Authentication failed.\n";
pub const ALREADY_AUTHENTICATED: &str = "User already authenticated.\n";
pub const NOT_AUTHENTICATED: &str = "User not authenticated. Use USER <username> <password>\n";
pub const MISSING_FILENAME: &str = "Please provide a filename.\n";
pub const CANNOT_SAVE: &str = "400 File cannot save on server side.\n";
pub const NO_DELETE_TARGET: &str = "No file specified for deletion.\n";
pub const DELETE_FAILED: &str = "Failed to delete file.\n";
pub const GOODBYE: &str = "Goodbye!\n";
pub const USAGE: &str = "Unknown command.\n\
USER <user_name> <password>\n\
LIST\n\
DEL <file_name>\n\
PUT <file_name>\n\
GET <file_name>\n\
QUIT\n";
pub const COMMAND_TOO_LONG: &str = "500 Command too long.\n";
pub const TOO_MANY_CONNECTIONS: &str = "421 Too many connections. Try again later.\n";

/// Format a status line
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\n", code, message)
}

pub fn file_not_found(filename: &str) -> String {
    format_response(NOT_FOUND, &format!("File {} not found.", filename))
}

pub fn file_not_on_server(filename: &str) -> String {
    format_response(NOT_FOUND, &format!("File {} is not on the server.", filename))
}

pub fn file_deleted(filename: &str) -> String {
    format_response(OK, &format!("File {} deleted.", filename))
}

pub fn file_saved(bytes: u64, filename: &str) -> String {
    format_response(
        OK,
        &format!("{} Byte {} file retrieved by server and was saved.", bytes, filename),
    )
}

/// One LIST line; the size is `-1` when it could not be measured.
pub fn list_entry(name: &str, size: i64) -> String {
    format!("{} {}\n", name, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_match_wire_format() {
        assert_eq!(file_not_found("a.txt"), "404 File a.txt not found.\n");
        assert_eq!(file_not_on_server("a.txt"), "404 File a.txt is not on the server.\n");
        assert_eq!(file_deleted("a.txt"), "200 File a.txt deleted.\n");
        assert_eq!(
            file_saved(11, "notes.txt"),
            "200 11 Byte notes.txt file retrieved by server and was saved.\n"
        );
        assert_eq!(list_entry("a.txt", 42), "a.txt 42\n");
    }

    #[test]
    fn test_usage_lists_all_six_verbs() {
        for verb in ["USER", "LIST", "GET", "PUT", "DEL", "QUIT"] {
            assert!(USAGE.contains(verb), "usage is missing {}", verb);
        }
        assert!(USAGE.starts_with("Unknown command.\n"));
    }

    #[test]
    fn test_fixed_messages_carry_their_codes() {
        assert!(COMMAND_TOO_LONG.starts_with(&COMMAND_TOO_LONG_CODE.to_string()));
        assert!(TOO_MANY_CONNECTIONS.starts_with(&TOO_MANY_CONNECTIONS_CODE.to_string()));
        assert!(AUTH_FAILED.starts_with(&BAD_REQUEST.to_string()));
        assert!(CANNOT_SAVE.starts_with(&BAD_REQUEST.to_string()));
    }
}
