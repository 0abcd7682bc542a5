//! Command-line quoting for Windows tools.
//!
//! Windows passes a single command-line string to child processes and each
//! program splits it itself. The Visual C++ runtime (and
//! `CommandLineToArgvW`) split on unquoted whitespace and give backslashes a
//! special meaning only when they precede a quote character. [`quote_arg`] is
//! the inverse of that splitting, so response files and logged command lines
//! reproduce the exact argument vector.

/// Quote one argument.
///
/// Arguments with no space and no quote character are returned unchanged.
/// Everything else is wrapped in quotes; a run of backslashes is doubled only
/// when it is followed by a quote (an interior one or the closing one), and
/// interior quotes are escaped.
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '"']) {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');

    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                push_backslashes(&mut out, backslashes * 2 + 1);
                out.push('"');
                backslashes = 0;
            }
            _ => {
                push_backslashes(&mut out, backslashes);
                out.push(c);
                backslashes = 0;
            }
        }
    }

    // The closing quote follows any trailing run.
    push_backslashes(&mut out, backslashes * 2);
    out.push('"');
    out
}

fn push_backslashes(out: &mut String, n: usize) {
    out.extend(std::iter::repeat('\\').take(n));
}

/// Quote every argument and join them with single spaces.
pub fn join_command_line<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a command line into arguments using the runtime's rules.
///
/// Used to read response files back and to check that quoting round-trips.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut arg = String::new();
        let mut in_quotes = false;

        while let Some(&c) = chars.peek() {
            match c {
                '\\' => {
                    let mut n = 0;
                    while chars.peek() == Some(&'\\') {
                        chars.next();
                        n += 1;
                    }
                    if chars.peek() == Some(&'"') {
                        push_backslashes(&mut arg, n / 2);
                        if n % 2 == 1 {
                            chars.next();
                            arg.push('"');
                        }
                        // Even run: the quote is handled as a delimiter next iteration.
                    } else {
                        push_backslashes(&mut arg, n);
                    }
                }
                '"' => {
                    chars.next();
                    if in_quotes && chars.peek() == Some(&'"') {
                        chars.next();
                        arg.push('"');
                    } else {
                        in_quotes = !in_quotes;
                    }
                }
                ' ' | '\t' | '\r' | '\n' if !in_quotes => break,
                _ => {
                    chars.next();
                    arg.push(c);
                }
            }
        }

        args.push(arg);
    }

    args
}
