use std::process;

use tinysh::Interpreter;

fn main() {
    env_logger::init();

    let code = Interpreter::new().repl();
    process::exit(code);
}
