pub const EDITOR_BANNER: &str = "<editor mode> use '.done' to submit or '.cancel' to cancel";

pub const EXIT_NOTICE: &str = "Exiting...";

pub const REPL_HELP: &str = "\
Client Commands:

    .help                     Print this help screen
    .monitor                  Start monitoring the process (status ticks)
    .unmonitor                Stop monitoring the process
    .load <file>              Load a source file and evaluate it in the process
    .load-blueprint <name>    Load a blueprint and evaluate it in the process
    .editor                   Enter multi-line editor mode
    .done                     Submit the editor buffer (editor mode only)
    .cancel                   Discard the editor buffer (editor mode only)
    .exit                     Quit the console

Any other input is evaluated as code in the connected process.
";
