use crate::node::Node;
use colored::Colorize;

/// Draws a declared tree as an ASCII box-drawing listing, without touching
/// any filesystem.
///
/// A single top-level directory renders as the root line; any other input
/// is listed under an implicit `.` root. Directories get a trailing `/`.
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();

    let (root_name, entries): (&str, &[Node]) = match nodes {
        [Node::Directory(dir)] => (dir.name(), dir.entries()),
        _ => (".", nodes),
    };

    out.push_str(root_name);
    out.push('\n');
    render_entries(&mut out, entries, "");
    out
}

fn render_entries(out: &mut String, entries: &[Node], prefix: &str) {
    let count = entries.len();

    for (index, entry) in entries.iter().enumerate() {
        let is_last = index + 1 == count;

        out.push_str(prefix);
        out.push_str(if is_last { "└── " } else { "├── " });
        out.push_str(entry.name());

        match entry {
            Node::Directory(dir) => {
                out.push_str("/\n");
                let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
                render_entries(out, dir.entries(), &child_prefix);
            }
            Node::File(_) => out.push('\n'),
        }
    }
}

/// Prints the same listing as [`render`] with directories in blue and files
/// in green, for interactive previews.
pub fn print_tree(nodes: &[Node]) {
    let (root_name, entries): (&str, &[Node]) = match nodes {
        [Node::Directory(dir)] => (dir.name(), dir.entries()),
        _ => (".", nodes),
    };

    println!("{}", root_name.blue());
    print_entries(entries, "");
}

fn print_entries(entries: &[Node], prefix: &str) {
    let count = entries.len();

    for (index, entry) in entries.iter().enumerate() {
        let is_last = index + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };

        match entry {
            Node::Directory(dir) => {
                println!(
                    "{}{}{}",
                    prefix.yellow(),
                    connector.yellow(),
                    format!("{}/", dir.name()).blue()
                );
                let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
                print_entries(dir.entries(), &child_prefix);
            }
            Node::File(file) => {
                println!(
                    "{}{}{}",
                    prefix.yellow(),
                    connector.yellow(),
                    file.name().green()
                );
            }
        }
    }
}
