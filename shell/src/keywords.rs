//! Command keyword tables.
//!
//! Each command directory is a static array of [`KeywordEntry`] rows plus a
//! prompt template and a name. Several rows may share a keyword as long as
//! they differ in argument count — the dispatcher picks by count, first
//! qualifying row in table order wins, so specific keywords go before the
//! `*` catch-all. A row with empty help *and* brief is hidden from the `?`
//! listing but still executes.

use alloc::vec::Vec;

use spin::Mutex;

use crate::input::CmdHandler;
use crate::{alias, config, convar, count, event, help, misc, pin, pwm, sequence, show, taskctl, uart};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgCount {
    /// Exactly this many arguments (not counting the command itself).
    Exact(u8),
    /// Any number of arguments.
    Many,
    /// No arguments at all.
    None,
}

pub struct KeywordEntry {
    pub cmd: &'static str,
    /// `None` marks a help-only row (it carries text for a keyword whose
    /// working rows are elsewhere).
    pub handler: Option<CmdHandler>,
    pub argc: ArgCount,
    /// Full help page shown by `? command`. Empty together with `brief`
    /// hides the entry.
    pub help: &'static str,
    /// One-liner for the `?` listing. Empty means "fall back to help".
    pub brief: &'static str,
}

impl KeywordEntry {
    pub const fn new(
        cmd: &'static str,
        handler: CmdHandler,
        argc: ArgCount,
        help: &'static str,
        brief: &'static str,
    ) -> Self {
        Self {
            cmd,
            handler: Some(handler),
            argc,
            help,
            brief,
        }
    }

    pub const fn hidden(cmd: &'static str, handler: CmdHandler, argc: ArgCount) -> Self {
        Self {
            cmd,
            handler: Some(handler),
            argc,
            help: "",
            brief: "",
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.help.is_empty() && self.brief.is_empty()
    }
}

pub struct Directory {
    pub name: &'static str,
    /// Prompt template; `%u` is replaced with the directory context.
    pub prompt: &'static str,
    pub entries: &'static [KeywordEntry],
}

/// Declare a command directory as a static named `KEYWORDS_<NAME>`.
macro_rules! keywords_decl {
    ($name:ident, $prompt:expr, [ $($entry:expr),* $(,)? ]) => {
        paste::paste! {
            pub static [<KEYWORDS_ $name:upper>]: Directory = Directory {
                name: stringify!($name),
                prompt: $prompt,
                entries: &[ $($entry),* ],
            };
        }
    };
}

// ---------------------------------------------------------------------------
// Directory registry
// ---------------------------------------------------------------------------

static REGISTRY: Mutex<Vec<&'static Directory>> = Mutex::new(Vec::new());

/// Register a directory. Registering the same directory twice is a no-op,
/// so several shell instances can share the process registry.
pub fn register(dir: &'static Directory) {
    let mut reg = REGISTRY.lock();
    if !reg.iter().any(|d| core::ptr::eq(*d, dir)) {
        reg.push(dir);
    }
}

/// Register every built-in directory. Called once during shell startup.
pub fn register_builtin() {
    register(&KEYWORDS_MAIN);
    register(&KEYWORDS_UART);
    register(&KEYWORDS_SEQUENCE);
    register(&KEYWORDS_ALIAS);
}

/// Is `name` (possibly shortened) the name of a command directory? Used by
/// the help listing to color directory-entering commands.
pub fn is_directory_name(name: &str) -> bool {
    REGISTRY
        .lock()
        .iter()
        .any(|d| espshell_lib::prefix_match(name, d.name))
}

// ---------------------------------------------------------------------------
// Main directory
// ---------------------------------------------------------------------------

const QUESTION_HELP: &str = "% \"? [<o>KEYWORD</>|<o>keys</>]\"\r\n\
%\r\n\
% Displays a list of commands or shows a help page for one command:\r\n\
% \"?\"         - Display a list of available commands\r\n\
% \"? <i>KEYWORD</>\" - Show the help page for the specified command\r\n\
% \"? <i>keys</>\"    - Show the terminal keys ESPShell understands\r\n";

const EXIT_HELP: &str = "% \"<b>exit</> [<o>exit</>]\"  (Hotkey: Ctrl+Z)\r\n\
% Exit from uart, sequence and other configuration modes.\r\n\
% Has no effect in the main mode unless typed twice (\"exit exit\"):\r\n\
% then ESPShell closes and stops its task\r\n";

keywords_decl!(main, config::PROMPT, [
    KeywordEntry::new("?", help::cmd_question, ArgCount::Many, QUESTION_HELP, "Commands list & help"),
    KeywordEntry::hidden("help", help::cmd_question, ArgCount::Many),

    KeywordEntry::new("uptime", misc::cmd_uptime, ArgCount::None,
        "% \"<b>uptime</>\"\r\n%\r\n% Shows time passed since the shell start\r\n",
        "System uptime"),

    KeywordEntry::new("suspend", taskctl::cmd_suspend, ArgCount::None,
        "% \"<b>suspend</>\"\r\n%\r\n\
         % Suspend the sketch task (Hotkey: Ctrl+C). Resume with \"resume\"\r\n",
        "Suspend sketch execution"),
    KeywordEntry::new("suspend", taskctl::cmd_suspend, ArgCount::Exact(1),
        "% \"<b>suspend</> <i>TASK_ID</>\"\r\n%\r\n\
         % Suspend an arbitrary task by its hex id (see background task banners)\r\n",
        ""),

    KeywordEntry::new("resume", taskctl::cmd_resume, ArgCount::None,
        "% \"<b>resume</>\"\r\n%\r\n% Resume the sketch task\r\n",
        "Resume sketch execution"),
    KeywordEntry::new("resume", taskctl::cmd_resume, ArgCount::Exact(1),
        "% \"<b>resume</> <i>TASK_ID</>\"\r\n%\r\n% Resume an arbitrary task by its hex id\r\n",
        ""),

    KeywordEntry::new("kill", taskctl::cmd_kill, ArgCount::Exact(2),
        "% \"<b>kill</> <o>[-term|-kill|-hup|-9|-15|-1]</> <i>TASK_ID</>\"\r\n%\r\n\
         % Ask a task to finish (default, <i>-term</>/<i>-15</>) or delete it (<i>-kill</>/<i>-9</>, unsafe).\r\n\
         % <i>-hup</>/<i>-1</> asks the task to re-read its configuration\r\n",
        "Kill tasks"),
    KeywordEntry::hidden("kill", taskctl::cmd_kill, ArgCount::Exact(1)),

    KeywordEntry::new("echo", misc::cmd_echo, ArgCount::Many,
        "% \"<b>echo</> <i>on|off|silent</>\"\r\n%\r\n\
         % Terminal echo control: <i>off</> stops echoing input, <i>silent</> mutes all output\r\n",
        "Terminal echo control"),

    KeywordEntry::new("colors", misc::cmd_colors, ArgCount::Many,
        "% \"<b>colors</> <i>on|off|auto</>\"\r\n%\r\n\
         % Enable/disable terminal colors. \"auto\" waits for evidence of a capable terminal\r\n",
        "Terminal color control"),

    KeywordEntry::new("history", misc::cmd_history, ArgCount::Many,
        "% \"<b>history</> <o>[on|off]</>\"\r\n%\r\n% Enable/disable command history\r\n",
        "Command history control"),

    KeywordEntry::new("tty", misc::cmd_tty, ArgCount::Exact(1),
        "% \"<b>tty</> <i>NUM</>\"\r\n%\r\n\
         % Move the shell console to device NUM (uart number, or 99 for USB-CDC)\r\n",
        "Switch console device"),

    KeywordEntry::new("hostid", misc::cmd_hostid, ArgCount::Many,
        "% \"<b>hostid</> <o>[NAME]</>\"\r\n%\r\n\
         % Set (or show) the host identifier displayed before the prompt.\r\n\
         % The value survives reboots\r\n",
        "Host identifier"),

    KeywordEntry::new("pin", pin::cmd_pin, ArgCount::Many,
        "% \"<b>pin</> <i>NUM</> <o>[ARG1 | ARG2 | ... | ARGn]*</>\"\r\n%\r\n\
         % Multifunction GPIO command. Keywords are executed in order, left to right;\r\n\
         % a decimal number selects a new current pin. Keywords can be shortened.\r\n\
         %\r\n\
         %   <i>high, low, toggle</>     - drive the pin\r\n\
         %   <i>in, out, open, up, down</> - accumulate & apply mode flags\r\n\
         %   <i>read, aread</>          - digital / analog read\r\n\
         %   <i>save, load</>           - snapshot / restore pin configuration\r\n\
         %   <i>hold, release</>        - freeze pin state across sleep\r\n\
         %   <i>reset</>                - detach the pin from its peripheral\r\n\
         %   <i>iomux [N|gpio]</>       - select IO-MUX function\r\n\
         %   <i>matrix [in|out SIG]</>  - GPIO-matrix routing (no args = disconnect)\r\n\
         %   <i>pwm FREQ DUTY</>        - start PWM (FREQ=0 stops)\r\n\
         %   <i>sequence NUM</>         - transmit RMT sequence NUM\r\n\
         %   <i>delay MS</>             - interruptible delay\r\n\
         %   <i>loop N|inf</>           - repeat the whole list (must be last)\r\n\
         %\r\n\
         % Ex.: \"pin 2 out high delay 500 low delay 500 loop inf &\" - blink forever\r\n",
        "GPIO commands"),

    KeywordEntry::new("pwm", pwm::cmd_pwm, ArgCount::Many,
        "% \"<b>pwm</> <i>PIN</> <o>[FREQ [DUTY]]</>\"\r\n%\r\n\
         % Start a PWM generator on a pin (\"pwm 2 1000 0.5\"), or stop it\r\n\
         % (\"pwm 2\" or \"pwm 2 0\"). DUTY is 0..1, default 0.5\r\n",
        "PWM output"),

    KeywordEntry::new("count", count::cmd_count, ArgCount::Many,
        "% \"<b>count</> <i>PIN</> <o>[TIME_MS|infinite] [trigger] [filter NS]</>\"\r\n%\r\n\
         % Count pulses on a pin for TIME_MS milliseconds (default 1000).\r\n\
         %   <i>trigger</>   - delay the measurement until the first pulse\r\n\
         %   <i>filter NS</> - ignore pulses shorter than NS nanoseconds\r\n\
         % Ex.: \"count 4 trigger 1000\" or \"count 4 infinite &\"\r\n",
        "Pulse counter / frequency meter"),

    KeywordEntry::new("sequence", sequence::cmd_seq_if, ArgCount::Exact(1),
        "% \"<b>sequence</> <i>NUM</>\"\r\n%\r\n\
         % Enter the pulse-sequence configuration mode for sequence NUM\r\n",
        "Pulse sequence configuration"),

    KeywordEntry::new("alias", alias::cmd_alias_if, ArgCount::Exact(1),
        "% \"<b>alias</> <i>NAME</>\"\r\n%\r\n\
         % Create (or edit) the command alias NAME. Every line typed afterwards is\r\n\
         % recorded; \"quit\" finishes editing, \"list\" shows content, \"delete\" edits it\r\n",
        "Command aliases"),

    KeywordEntry::new("exec", alias::cmd_exec, ArgCount::Many,
        "% \"<b>exec</> <i>NAME1</> <o>[NAME2 ... NAMEn]</>\"\r\n%\r\n\
         % Execute command aliases, in order\r\n",
        "Execute aliases"),

    KeywordEntry::new("if", event::cmd_if, ArgCount::Many,
        "% \"<b>if</> <i>rising|falling PIN</> <o>[low PIN|high PIN]* [max-exec N] [rate-limit MS]</> <i>exec ALIAS</>\"\r\n\
         % \"<b>if</> <i>low|high PIN ...</> <o>[poll MS] [delay MS]</> <i>exec ALIAS</>\"\r\n\
         % \"<b>if</> <i>delete|clear|enable|disable</> <o>ID|all</>\"\r\n\
         % \"<b>if</> <i>save</> <o>ID|*</> <i>PATH</>\"\r\n%\r\n\
         % Execute an alias when a GPIO edge (or a polled pin condition) matches.\r\n\
         % Ex.: \"if rising 3 exec blink\", \"if low 5 high 6 poll 100 exec warn\"\r\n",
        "GPIO event rules"),

    KeywordEntry::new("every", event::cmd_if, ArgCount::Many,
        "% \"<b>every</> <i>NUM</> <o>[ms|sec|min|hour]</> <i>exec ALIAS</> <o>[max-exec N] [delay MS]</>\"\r\n\
         % \"<b>every</> <i>delete|clear|enable|disable</> <o>ID|all</>\"\r\n%\r\n\
         % Execute an alias periodically. Ex.: \"every 5 sec exec blink\"\r\n",
        "Periodic rules"),

    KeywordEntry::new("var", convar::cmd_var, ArgCount::Many,
        "% \"<b>var</> <o>[NAME [VALUE] | NUMBER]</>\"\r\n%\r\n\
         % Display or change registered sketch variables:\r\n\
         %   \"var\"            - list registered variables\r\n\
         %   \"var NAME\"       - display one variable (arrays: NAME[INDEX])\r\n\
         %   \"var NAME VALUE\" - set. VALUE is decimal, 0x-hex, 0b-binary, 0-octal or float\r\n\
         %   \"var NUMBER\"     - display a number in every base\r\n",
        "Sketch variables"),

    KeywordEntry::new("show", show::cmd_show, ArgCount::Many,
        "% \"<b>show</> <i>pwm|counters|ifs|alias|sequence|history|pin</> <o>[ARG]</>\"\r\n%\r\n\
         % Display the state of a subsystem\r\n",
        "Display system information"),

    KeywordEntry::new("uart", uart::cmd_uart_if, ArgCount::Exact(1),
        "% \"<b>uart</> <i>NUM</>\"\r\n%\r\n% Enter the UART configuration mode\r\n",
        "UART configuration"),

    KeywordEntry::new("exit", misc::cmd_exit, ArgCount::Many, EXIT_HELP, "Exit"),
]);

// ---------------------------------------------------------------------------
// UART directory
// ---------------------------------------------------------------------------

keywords_decl!(uart, config::PROMPT_UART, [
    KeywordEntry::new("?", help::cmd_question, ArgCount::Many, QUESTION_HELP, "Commands list & help"),
    KeywordEntry::hidden("help", help::cmd_question, ArgCount::Many),

    KeywordEntry::new("up", uart::cmd_uart_up, ArgCount::Many,
        "% \"<b>up</> <o>[BAUD]</>\"\r\n%\r\n% Initialize the UART (default 115200 baud)\r\n",
        "Initialize the UART"),
    KeywordEntry::new("down", uart::cmd_uart_down, ArgCount::None,
        "% \"<b>down</>\"\r\n%\r\n% Shut the UART down\r\n",
        "Shut the UART down"),
    KeywordEntry::new("baud", uart::cmd_uart_baud, ArgCount::Exact(1),
        "% \"<b>baud</> <i>RATE</>\"\r\n%\r\n% Change the baudrate\r\n",
        "Set baudrate"),
    KeywordEntry::new("read", uart::cmd_uart_read, ArgCount::None,
        "% \"<b>read</>\"\r\n%\r\n% Read and display whatever arrived on the UART\r\n",
        "Read bytes"),
    KeywordEntry::new("write", uart::cmd_uart_write, ArgCount::Many,
        "% \"<b>write</> <i>TEXT...</>\"\r\n%\r\n\
         % Send TEXT over the UART. Escapes \\r \\n \\t \\\\ \\xHH are decoded\r\n",
        "Send bytes"),
    KeywordEntry::new("tap", uart::cmd_uart_tap, ArgCount::None,
        "% \"<b>tap</>\"\r\n%\r\n\
         % Bridge the console to this UART until a pause in traffic and a keypress\r\n",
        "Talk to the device behind the UART"),

    KeywordEntry::new("exit", misc::cmd_exit, ArgCount::Many, EXIT_HELP, "Exit"),
]);

// ---------------------------------------------------------------------------
// Sequence directory
// ---------------------------------------------------------------------------

keywords_decl!(sequence, config::PROMPT_SEQ, [
    KeywordEntry::new("?", help::cmd_question, ArgCount::Many, QUESTION_HELP, "Commands list & help"),
    KeywordEntry::hidden("help", help::cmd_question, ArgCount::Many),

    KeywordEntry::new("tick", sequence::cmd_seq_tick, ArgCount::Exact(1),
        "% \"<b>tick</> <i>TIME</>\"\r\n%\r\n\
         % RMT tick length in microseconds (0.0125 .. 3.2), e.g. \"tick 0.1\"\r\n",
        "Set tick length"),

    KeywordEntry::new("zero", sequence::cmd_seq_zeroone, ArgCount::Exact(1),
        "% \"<b>zero</> <i>LEVEL/DURATION</> <o>[LEVEL2/DURATION2]</>\"\r\n%\r\n\
         % Define what a \"0\" bit looks like: one level (\"zero 0/50\") or a\r\n\
         % pulse (\"zero 1/30 0/70\"). Must be the same form as \"one\"\r\n",
        "Define a \"0\" bit"),
    KeywordEntry::hidden("zero", sequence::cmd_seq_zeroone, ArgCount::Exact(2)),
    KeywordEntry::new("one", sequence::cmd_seq_zeroone, ArgCount::Exact(1),
        "% \"<b>one</> <i>LEVEL/DURATION</> <o>[LEVEL2/DURATION2]</>\"\r\n%\r\n\
         % Define what a \"1\" bit looks like\r\n",
        "Define a \"1\" bit"),
    KeywordEntry::hidden("one", sequence::cmd_seq_zeroone, ArgCount::Exact(2)),
    KeywordEntry::new("head", sequence::cmd_seq_zeroone, ArgCount::Exact(1),
        "% \"<b>head</> <i>LEVEL/DURATION</> <o>[LEVEL2/DURATION2]</>\"\r\n%\r\n\
         % Leading symbol sent before the data bits. \"head\" and \"tail\" go together\r\n",
        "Leading symbol"),
    KeywordEntry::hidden("head", sequence::cmd_seq_zeroone, ArgCount::Exact(2)),
    KeywordEntry::new("tail", sequence::cmd_seq_zeroone, ArgCount::Exact(1),
        "% \"<b>tail</> <i>LEVEL/DURATION</> <o>[LEVEL2/DURATION2]</>\"\r\n%\r\n\
         % Trailing symbol sent after the data bits\r\n",
        "Trailing symbol"),
    KeywordEntry::hidden("tail", sequence::cmd_seq_zeroone, ArgCount::Exact(2)),

    KeywordEntry::new("bits", sequence::cmd_seq_bits, ArgCount::Exact(1),
        "% \"<b>bits</> <i>STRING</>\"\r\n%\r\n\
         % Data to send, as a bit string: \"bits 10110010\"\r\n",
        "Set data bits"),

    KeywordEntry::new("levels", sequence::cmd_seq_levels, ArgCount::Many,
        "% \"<b>levels</> <i>LEVEL/DURATION</>...\"\r\n%\r\n\
         % Direct definition of the signal: \"levels 1/50 0/50 1/100 0/100\"\r\n",
        "Set levels directly"),

    KeywordEntry::new("modulation", sequence::cmd_seq_modulation, ArgCount::Many,
        "% \"<b>modulation</> <i>FREQ</> <o>[DUTY [high|low]]</>\"\r\n%\r\n\
         % Carrier modulation: frequency, duty (0..1, default 0.5) and which\r\n\
         % levels get modulated (default high). FREQ=0 disables\r\n",
        "Carrier modulation"),

    KeywordEntry::new("eot", sequence::cmd_seq_eot, ArgCount::Exact(1),
        "% \"<b>eot</> <i>high|low</>\"\r\n%\r\n\
         % Level the pin is left at after the transmission (default low)\r\n",
        "End-of-transmission level"),

    KeywordEntry::new("loop", sequence::cmd_seq_loop, ArgCount::Exact(1),
        "% \"<b>loop</> <i>COUNT|infinite|off</>\"\r\n%\r\n\
         % Transmit the sequence COUNT times, or continuously\r\n",
        "Loop the transmission"),

    KeywordEntry::new("show", sequence::cmd_seq_show, ArgCount::None,
        "% \"<b>show</>\"\r\n%\r\n% Display this sequence\r\n",
        "Display the sequence"),

    KeywordEntry::new("save", sequence::cmd_seq_save, ArgCount::Exact(1),
        "% \"<b>save</> <i>PATH</>\"\r\n%\r\n\
         % Append this sequence, as commands, to a file\r\n",
        "Save the sequence"),

    KeywordEntry::new("exit", misc::cmd_exit, ArgCount::Many, EXIT_HELP, "Exit"),
]);

// ---------------------------------------------------------------------------
// Alias editing directory
// ---------------------------------------------------------------------------

// No "exit" entry here: "exit" is legitimate alias content and is captured
// by the catch-all. "quit" leaves the editor instead.
keywords_decl!(alias, config::PROMPT_ALIAS, [
    KeywordEntry::new("?", help::cmd_question, ArgCount::Many, QUESTION_HELP, "Commands list & help"),

    KeywordEntry::new("list", alias::cmd_alias_list, ArgCount::None,
        "% \"<b>list</>\"\r\n%\r\n% Display the alias content\r\n",
        "Display the alias"),

    KeywordEntry::new("delete", alias::cmd_alias_delete, ArgCount::Many,
        "% \"<b>delete</> <o>[all|NUMBER]</>\"\r\n%\r\n\
         % Delete the last recorded line, line NUMBER, or everything\r\n",
        "Delete lines"),

    KeywordEntry::new("quit", alias::cmd_alias_quit, ArgCount::Many,
        "% \"<b>quit</>\"\r\n%\r\n% Finish alias editing\r\n",
        "Finish editing"),

    KeywordEntry::hidden("*", alias::cmd_alias_asterisk, ArgCount::Many),
]);
