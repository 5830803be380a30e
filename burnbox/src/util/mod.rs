mod command;
mod fs;

pub use command::{
    CommandOutput, CommandRunner, CommandSpec, DryRunRunner, SystemRunner, find_in_path,
};
pub use fs::{append_block, sha256_hex, write_file, write_executable};

#[cfg(test)]
pub(crate) use command::testing;

/// Whether stdin is attached to a terminal.
pub fn stdin_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}
