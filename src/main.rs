//! C-Lesh CLI and debug monitor
//!
//! Usage:
//!   clesh run <game> <memory> [options]   - Compile and run a game
//!   clesh dump <game> <memory>            - Print the compiled program
//!   clesh debug <game> <memory>           - Step through a game interactively
//!   clesh help                            - Show help message

use std::collections::BTreeMap;
use std::env;
use std::process;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use clesh::{CleshError, Console, Program, Settings, Status, VERSION, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "run" => run_game(&args[2..]),
        "dump" => dump_game(&args[2..]),
        "debug" => debug_game(&args[2..]),
        "help" | "--help" | "-h" => print_help(),
        "version" | "--version" | "-v" => println!("C-Lesh {}", VERSION),
        _ => {
            eprintln!("{}: unknown command '{}'", "error".red(), args[1]);
            print_help();
            process::exit(1);
        }
    }
}

fn print_help() {
    println!("{}", "C-Lesh".cyan().bold());
    println!("A block-addressed game scripting language");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  clesh run <game> <memory>     Compile <game>/<game>.clsh and run it");
    println!("  clesh dump <game> <memory>    Print the compiled blocks and symbols");
    println!("  clesh debug <game> <memory>   Step through a game in the monitor");
    println!("  clesh help                    Show this help message");
    println!("  clesh version                 Show version\n");
    println!("{}", "RUN OPTIONS:".yellow());
    println!("  --quantum <ms>   Time slice per execute call (default 20)");
    println!("  --seed <n>       Seed for the rand operator");
    println!("  --trace          Print every interpreted block");
    println!("  --echo           Print each frame's text output\n");
    println!("{}", "EXAMPLES:".yellow());
    println!("  clesh run games/pong 4096 --echo");
    println!("  clesh dump games/pong 4096");
}

fn settings_or_exit(args: &[String]) -> Settings {
    match Settings::from_args(args) {
        Ok(settings) => settings,
        Err(msg) => {
            eprintln!("{}: {}", "error".red(), msg);
            eprintln!("Usage: clesh <run|dump|debug> <game> <memory>");
            process::exit(1);
        }
    }
}

fn report(err: &CleshError) {
    eprintln!("{}", "---SCRIPT ERROR---".red().bold());
    eprintln!("{}", err);
}

fn load_or_exit(settings: &Settings, console: &mut Console) -> Program {
    match clesh::load(settings, console) {
        Ok(program) => program,
        Err(e) => {
            report(&e);
            process::exit(1);
        }
    }
}

fn run_game(args: &[String]) {
    let settings = settings_or_exit(args);
    let mut console = Console::new(&settings.root);
    let program = load_or_exit(&settings, &mut console);
    let mut vm = settings.build_vm(program);

    let mut frames = console.frames();
    loop {
        let status = match vm.execute(&mut console) {
            Ok(status) => status,
            Err(e) => {
                report(&e);
                process::exit(1);
            }
        };
        if settings.echo && console.frames() != frames {
            frames = console.frames();
            print_frame(&console);
        }
        if status == Status::Halted {
            break;
        }
    }

    if settings.trace {
        eprintln!(
            "{} pc {} after {} frames, {} ms paused",
            "halted".cyan(),
            vm.pc(),
            console.frames(),
            console.paused().as_millis()
        );
    }
}

fn print_frame(console: &Console) {
    for text in &console.last_frame().texts {
        let c = text.color;
        println!(
            "{} {}",
            format!("[{:>4},{:>4}]", text.x, text.y).dimmed(),
            text.text.truecolor(c.red, c.green, c.blue)
        );
    }
}

fn dump_game(args: &[String]) {
    let settings = settings_or_exit(args);
    let mut console = Console::new(&settings.root);
    let program = load_or_exit(&settings, &mut console);

    println!(
        "{} {} blocks used of {}",
        settings.game.cyan().bold(),
        program.used,
        program.memory.len()
    );
    for (address, block) in program.memory.blocks()[..program.used].iter().enumerate() {
        match program.source_line(address) {
            Some((line, _)) => println!(
                "{} {}  {}",
                format!("{:04}", address).cyan(),
                block,
                format!("; line {}", line).dimmed()
            ),
            None => println!("{} {}", format!("{:04}", address).cyan(), block),
        }
    }

    println!("\n{}", "SYMBOLS:".yellow());
    for (name, value) in program.symbols.iter() {
        println!("  {:<16} {}", name, value);
    }
}

fn debug_game(args: &[String]) {
    let settings = settings_or_exit(args);
    let mut console = Console::new(&settings.root);
    let program = load_or_exit(&settings, &mut console);
    let lines = program.lines.clone();
    let mut vm = settings.build_vm(program);

    println!(
        "{} {} - {}",
        "C-Lesh monitor".cyan().bold(),
        VERSION.cyan(),
        settings.game.dimmed()
    );
    println!("Type {} to exit, {} for help\n", "quit".yellow(), "help".yellow());

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start monitor: {}", "error".red(), e);
            process::exit(1);
        }
    };

    loop {
        match rl.readline(&format!("{} ", "clesh>".green().bold())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let words: Vec<&str> = line.split_whitespace().collect();
                let number = |index: usize, default: usize| {
                    words
                        .get(index)
                        .and_then(|w| w.parse::<usize>().ok())
                        .unwrap_or(default)
                };

                match words[0] {
                    "quit" | "exit" => break,
                    "help" => print_monitor_help(),
                    "step" => {
                        for _ in 0..number(1, 1) {
                            match vm.step(&mut console) {
                                Ok(Status::Yielded) => {}
                                Ok(Status::Halted) => {
                                    println!("{}", "halted".cyan());
                                    break;
                                }
                                Err(e) => {
                                    report(&e);
                                    break;
                                }
                            }
                        }
                        show_pc(&vm, &lines);
                    }
                    "run" => loop {
                        match vm.execute(&mut console) {
                            Ok(Status::Yielded) => {}
                            Ok(Status::Halted) => {
                                println!("{}", "halted".cyan());
                                break;
                            }
                            Err(e) => {
                                report(&e);
                                break;
                            }
                        }
                    },
                    "pc" => show_pc(&vm, &lines),
                    "stack" => {
                        if vm.stack().is_empty() {
                            println!("{}", "(empty)".dimmed());
                        }
                        for (depth, address) in vm.stack().iter().rev().enumerate() {
                            println!("  {} {:04}", depth, address);
                        }
                    }
                    "mem" => {
                        let start = number(1, 0);
                        let end = start.saturating_add(number(2, 1)).min(vm.memory().len());
                        for address in start..end {
                            let block = &vm.memory().blocks()[address];
                            let fields: Vec<String> = block
                                .fields
                                .iter()
                                .map(|(k, v)| format!("{}={}", k, v))
                                .collect();
                            println!(
                                "{} {} {}",
                                format!("{:04}", address).cyan(),
                                block.value,
                                fields.join(" ").dimmed()
                            );
                        }
                    }
                    "dis" => {
                        let start = number(1, vm.pc());
                        print!("{}", vm.memory().disassemble(start, number(2, 8)));
                    }
                    "sym" => match words.get(1) {
                        Some(name) => match vm.symbols().get(name) {
                            Some(value) => println!("  {} = {}", name, value),
                            None => println!("{}", format!("'{}' is not defined", name).dimmed()),
                        },
                        None => {
                            for (name, value) in vm.symbols().iter() {
                                println!("  {:<16} {}", name, value);
                            }
                        }
                    },
                    other => {
                        eprintln!("{}: unknown monitor command '{}'", "error".red(), other);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

fn show_pc(vm: &VM, lines: &BTreeMap<usize, (usize, String)>) {
    if vm.is_halted() {
        println!("pc {} {}", vm.pc(), "(halted)".dimmed());
        return;
    }
    let block = &vm.memory().blocks()[vm.pc()];
    print!("pc {} {}", format!("{:04}", vm.pc()).cyan(), block);
    match lines.get(&vm.pc()) {
        Some((number, text)) => println!("  {}", format!("; line {}: {}", number, text.trim()).dimmed()),
        None => println!(),
    }
}

fn print_monitor_help() {
    println!("{}", "Monitor Commands:".yellow());
    println!("  step [n]           Interpret n blocks (default 1)");
    println!("  run                Run until the program halts");
    println!("  pc                 Show the next block to run");
    println!("  stack              Show the call stack");
    println!("  mem <addr> [n]     Show values and fields of n blocks");
    println!("  dis [addr] [n]     Disassemble n blocks (default: 8 from pc)");
    println!("  sym [name]         Show one or all symbols");
    println!("  quit, exit         Leave the monitor");
}
