//! Compile-time limits and prompt templates.

/// Maximum input line length; longer input is silently discarded.
pub const MAX_INPUT_LENGTH: usize = 500;

/// Maximum length of a command keyword.
pub const MAX_CMDNAME_LEN: usize = 10;

/// Number of RMT sequence slots.
pub const SEQUENCES_NUM: usize = 10;

/// Dense pin index space: two 32-bit level registers.
pub const NUM_PINS: usize = 64;

/// ISR-to-daemon pipe depth of the event engine.
pub const MPIPE_CAPACITY: usize = 16;

/// How often to re-check whether the console device came up, ms.
pub const CONSOLE_UP_POLL_MS: u32 = 1000;

/// Default console device index selected at startup.
pub const STARTUP_PORT: u8 = 0;

/// CPU core the shell and its background commands are pinned to.
pub const SHELL_CORE: u8 = 0;

// Prompts. `%u` is replaced with the directory context number.
pub const PROMPT: &str = "esp32#>";
pub const PROMPT_UART: &str = "esp32-uart%u>";
pub const PROMPT_SEQ: &str = "esp32-seq%u>";
pub const PROMPT_ALIAS: &str = "esp32-alias>";

/// Key under which the host identifier is persisted.
pub const HOSTID_KEY: &str = "hostid";
