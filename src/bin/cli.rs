//! LineQueue CLI Client
//!
//! Command-line interface for interacting with a LineQueue server.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use linequeue::protocol::{Command, LineFramer, ERROR_MARKER};

/// LineQueue CLI
#[derive(Parser, Debug)]
#[command(name = "linequeue-cli")]
#[command(about = "CLI for the LineQueue server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:10042")]
    server: String,

    /// How long to wait for a GET response (milliseconds)
    #[arg(short, long, default_value = "2000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a line to the queue
    Put {
        /// The line to store (CRLF appended)
        line: String,
    },

    /// Take lines from the head of the queue
    Get {
        /// Number of lines
        count: usize,
    },

    /// Stop the server and dump the queue
    Shutdown,

    /// Ask the server to close the connection
    Quit,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Put { line } => Command::Put { line: Bytes::from(format!("{}\r\n", line)) },
        Commands::Get { count } => Command::Get { count },
        Commands::Shutdown => Command::Shutdown,
        Commands::Quit => Command::Quit,
    };

    match run(&args.server, &command, Duration::from_millis(args.timeout_ms)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(server: &str, command: &Command, timeout: Duration) -> io::Result<ExitCode> {
    let mut stream = TcpStream::connect(server)?;
    stream.set_nodelay(true)?;
    stream.write_all(&command.encode())?;
    stream.flush()?;

    let Command::Get { count } = *command else {
        return Ok(ExitCode::SUCCESS);
    };
    if count == 0 {
        return Ok(ExitCode::SUCCESS);
    }

    stream.set_read_timeout(Some(timeout))?;
    let lines = read_lines(&mut stream, count)?;

    if lines.first().map(|l| &l[..]) == Some(ERROR_MARKER) {
        eprintln!("server answered ERR (not enough lines stored?)");
        return Ok(ExitCode::FAILURE);
    }

    let mut stdout = io::stdout().lock();
    for line in lines {
        stdout.write_all(&line)?;
    }
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// Collect `count` lines, or the error marker, from the response stream
fn read_lines(stream: &mut TcpStream, count: usize) -> io::Result<Vec<Bytes>> {
    let mut framer = LineFramer::new();
    let mut lines = Vec::with_capacity(count);
    let mut buf = [0u8; 1024];

    while lines.len() < count {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed after {} of {} lines", lines.len(), count),
            ));
        }

        lines.extend(framer.extract_completed_lines(&buf[..n]));
        if lines.first().map(|l| &l[..]) == Some(ERROR_MARKER) {
            break;
        }
    }

    Ok(lines)
}
