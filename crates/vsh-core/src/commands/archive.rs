//! Archive commands: `tar`, `zip`, `unzip`.
//!
//! Archives are JSON documents stored as ordinary files (see
//! [`crate::archive`]). Members are extracted below the working directory.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::archive::{Extracted, TarArchive, TarEntry, ZipArchive, ZipEntry};
use crate::error::{ArchiveError, CommandError};
use crate::models::OutputLine;
use crate::state::ShellState;
use crate::utils::format::compression_ratio;

use super::{Category, Command, CommandContext, CommandResult, Invocation, Registry};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Tar));
    registry.register(Box::new(Zip));
    registry.register(Box::new(Unzip));
}

const TAR_USAGE: &str = "usage: tar [options] archive [files...]\n\
Options:\n  -c: create archive\n  -x: extract archive\n  -v: verbose\n  -f: specify filename\n  -t: list contents\n\
Example: tar -cvf archive.tar file1.txt file2.txt";

const ZIP_USAGE: &str = "usage: zip [-r] archive.zip [files...]\n\
Options:\n  -r: recursive (include directories)\n\
Example: zip -r archive.zip folder/ file.txt";

const UNZIP_USAGE: &str = "usage: unzip [-l] archive.zip\n\
Options:\n  -l: list contents without extracting\n\
Example: unzip archive.zip";

/// Creation timestamp in the ISO-8601 form stored in documents.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Content of an archive file, or `None` when it cannot be read.
fn read_archive(state: &ShellState, name: &str) -> Option<String> {
    let path = state.resolve_path(name);
    state.fs.read_file(&path).ok().map(str::to_string)
}

/// Decoding failures are reported against the archive name.
fn document_error(name: &str, err: ArchiveError) -> CommandError {
    CommandError::usage(format!("{}: {}", name, err))
}

fn write_archive(state: &mut ShellState, name: &str, json: &str) -> Result<(), CommandError> {
    let path = state.resolve_path(name);
    state
        .fs
        .write_file(&path, json)
        .map_err(|_| CommandError::usage(format!("cannot create archive {}", name)))?;
    state.stats.files += 1;
    Ok(())
}

/// Output lines for extracted members, plus the number that succeeded.
fn extraction_report(
    results: Vec<Extracted>,
    render: impl Fn(&Extracted) -> Option<String>,
) -> (Vec<OutputLine>, usize) {
    let mut lines = Vec::new();
    let mut extracted = 0;
    for result in &results {
        if let Extracted::Failed { path, error } = result {
            log::debug!("extract {}: {}", path, error);
        } else {
            extracted += 1;
        }
        if let Some(text) = render(result) {
            let line = if matches!(result, Extracted::Failed { .. }) {
                OutputLine::error(text)
            } else {
                OutputLine::text(text)
            };
            lines.push(line);
        }
    }
    (lines, extracted)
}

// =============================================================================
// tar
// =============================================================================

struct Tar;

#[derive(Default)]
struct TarOptions {
    create: bool,
    extract: bool,
    list: bool,
    verbose: bool,
    archive: Option<String>,
    files: Vec<String>,
}

impl TarOptions {
    /// Bundled flags (`-cvf`); `f` takes the next word as the archive name.
    fn parse(args: &[String]) -> Self {
        let mut opts = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if let Some(flags) = arg.strip_prefix('-') {
                for flag in flags.chars() {
                    match flag {
                        'c' => opts.create = true,
                        'x' => opts.extract = true,
                        't' => opts.list = true,
                        'v' => opts.verbose = true,
                        'f' => {
                            if let Some(name) = iter.next() {
                                opts.archive = Some(name.clone());
                            }
                        }
                        _ => {}
                    }
                }
            } else if opts.archive.is_none() {
                opts.archive = Some(arg.clone());
            } else {
                opts.files.push(arg.clone());
            }
        }
        opts
    }
}

impl Tar {
    fn create(&self, state: &mut ShellState, name: &str, opts: &TarOptions) -> Result<CommandResult, CommandError> {
        if opts.files.is_empty() {
            return Err(CommandError::usage("no files specified for archive"));
        }

        let mut archive = TarArchive::new(timestamp());
        let mut lines = Vec::new();
        for file in &opts.files {
            let path = state.resolve_path(file);
            let added = archive
                .add_path(&state.fs, &path, file)
                .map_err(|e| CommandError::fs(file.clone(), e))?;
            if opts.verbose {
                for key in added {
                    let text = match archive.files.get(&key) {
                        Some(TarEntry::Directory) => format!("{}/", key),
                        _ => key,
                    };
                    lines.push(OutputLine::text(text));
                }
            }
        }

        write_archive(state, name, &archive.to_json()?)?;
        if !opts.verbose {
            lines.push(OutputLine::success(format!(
                "Created archive: {} ({} items, {} bytes)",
                name,
                archive.files.len(),
                archive.total_size()
            )));
        }
        Ok(CommandResult::output(lines))
    }

    fn extract(&self, state: &mut ShellState, name: &str, verbose: bool) -> Result<CommandResult, CommandError> {
        let text = read_archive(state, name)
            .ok_or_else(|| CommandError::usage(format!("{}: No such file or directory", name)))?;
        let archive = TarArchive::parse(&text).map_err(|e| document_error(name, e))?;

        let cwd = state.cwd.clone();
        let results = archive.extract(&mut state.fs, &cwd);
        let (mut lines, extracted) = extraction_report(results, |r| match r {
            Extracted::Directory(key) if verbose => Some(format!("{}/", key)),
            Extracted::File(key) if verbose => Some(key.clone()),
            Extracted::Failed { error, .. } => Some(format!("tar: {}", error)),
            _ => None,
        });
        state.stats.files += extracted as u64;

        if !verbose {
            lines.push(OutputLine::success(format!(
                "Extracted {} items from {}",
                extracted, name
            )));
        }
        Ok(CommandResult::output(lines))
    }

    fn list(&self, state: &ShellState, name: &str, verbose: bool) -> Result<CommandResult, CommandError> {
        let text = read_archive(state, name)
            .ok_or_else(|| CommandError::usage(format!("{}: No such file or directory", name)))?;
        let archive = TarArchive::parse(&text).map_err(|e| document_error(name, e))?;

        let lines = archive
            .files
            .iter()
            .map(|(key, entry)| match entry {
                TarEntry::Directory => format!("{}/", key),
                TarEntry::File { size, .. } if verbose => format!("{} ({} bytes)", key, size),
                TarEntry::File { .. } => key.clone(),
            })
            .map(OutputLine::text)
            .collect();
        Ok(CommandResult::output(lines))
    }
}

impl Command for Tar {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn description(&self) -> &'static str {
        "Create, extract or list tar archives"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.len() < 2 {
            return Err(CommandError::usage(TAR_USAGE));
        }
        let opts = TarOptions::parse(&inv.args);
        let Some(name) = opts.archive.clone() else {
            return Err(CommandError::usage("no archive name specified"));
        };

        if opts.create {
            self.create(ctx.state, &name, &opts)
        } else if opts.extract {
            self.extract(ctx.state, &name, opts.verbose)
        } else if opts.list {
            self.list(ctx.state, &name, opts.verbose)
        } else {
            Err(CommandError::usage(
                "you must specify either -c (create), -x (extract), or -t (list)",
            ))
        }
    }
}

// =============================================================================
// zip
// =============================================================================

struct Zip;

impl Command for Zip {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn description(&self) -> &'static str {
        "Create zip archives"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.len() < 2 {
            return Err(CommandError::usage(ZIP_USAGE));
        }
        let recursive = inv.args.iter().any(|a| a == "-r");
        let operands: Vec<&String> = inv.args.iter().filter(|a| *a != "-r").collect();
        let Some((name, files)) = operands.split_first().filter(|(_, files)| !files.is_empty()) else {
            return Err(CommandError::usage("missing archive name or files"));
        };

        let state = &mut *ctx.state;
        let mut archive = ZipArchive::new(timestamp());
        let mut lines = Vec::new();
        for file in files {
            let path = state.resolve_path(file);
            for report in archive.add_path(&state.fs, &path, file, recursive)? {
                let text = match report.ratio {
                    _ if report.is_dir => format!("  adding: {}/", report.key),
                    Some(ratio) => format!("  adding: {} (deflated {}%)", report.key, ratio),
                    None => format!("  adding: {} (stored)", report.key),
                };
                lines.push(OutputLine::text(text));
            }
        }

        write_archive(state, name, &archive.to_json()?)?;

        let (original, compressed) = archive.totals();
        let summary = if compressed < original {
            format!("{}% compression", compression_ratio(original, compressed))
        } else if compressed == original {
            "no compression".to_string()
        } else {
            "stored".to_string()
        };
        lines.push(OutputLine::empty());
        lines.push(OutputLine::success(format!(
            "Created: {} ({} files, {} → {} bytes, {})",
            name,
            archive.files.len(),
            original,
            compressed,
            summary
        )));
        Ok(CommandResult::output(lines))
    }
}

// =============================================================================
// unzip
// =============================================================================

struct Unzip;

/// `created` rendered for listings; unparseable stamps print as stored.
fn listing_date(created: &str) -> String {
    DateTime::parse_from_rfc3339(created)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| created.to_string())
}

impl Unzip {
    fn list(&self, name: &str, archive: &ZipArchive) -> Vec<OutputLine> {
        let date = listing_date(&archive.created);
        let mut lines = vec![OutputLine::text(format!("Archive:  {}", name))];
        for (key, entry) in &archive.files {
            let text = match entry {
                ZipEntry::Directory => format!("{:>8}  {}   {}/", 0, date, key),
                ZipEntry::File {
                    original_size,
                    actually_compressed: true,
                    ..
                } => format!("{:>8}  {}   {} ({}%)", original_size, date, key, entry.ratio()),
                ZipEntry::File { original_size, .. } => {
                    format!("{:>8}  {}   {} (stored)", original_size, date, key)
                }
            };
            lines.push(OutputLine::text(text));
        }

        let (original, compressed) = archive.totals();
        lines.push(OutputLine::text("--------                  -------"));
        lines.push(OutputLine::text(format!(
            "{:>8}                  {} files ({}% compression)",
            original,
            archive.files.len(),
            compression_ratio(original, compressed)
        )));
        lines
    }
}

impl Command for Unzip {
    fn name(&self) -> &'static str {
        "unzip"
    }

    fn description(&self) -> &'static str {
        "Extract zip archives"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.is_empty() {
            return Err(CommandError::usage(UNZIP_USAGE));
        }
        let list_only = inv.args.iter().any(|a| a == "-l");
        let Some(name) = inv.args.iter().find(|a| *a != "-l") else {
            return Err(CommandError::usage("no archive specified"));
        };

        let text = read_archive(ctx.state, name)
            .ok_or_else(|| CommandError::usage(format!("cannot find or open {}", name)))?;
        let archive = ZipArchive::parse(&text).map_err(|e| document_error(name, e))?;

        if list_only {
            return Ok(CommandResult::output(self.list(name, &archive)));
        }

        let state = &mut *ctx.state;
        let cwd = state.cwd.clone();
        let results = archive.extract(&mut state.fs, &cwd);
        let (body, extracted) = extraction_report(results, |r| {
            Some(match r {
                Extracted::Directory(key) => format!("  creating: {}/", key),
                Extracted::File(key) => format!("  inflating: {}", key),
                Extracted::Failed { path, .. } => format!("  error extracting: {}", path),
            })
        });
        state.stats.files += extracted as u64;

        let mut lines = vec![OutputLine::text(format!("Archive:  {}", name))];
        lines.extend(body);
        lines.push(OutputLine::empty());
        lines.push(OutputLine::success(format!(
            "Extracted {} files from {}",
            extracted, name
        )));
        Ok(CommandResult::output(lines))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{run, run_plain};
    use crate::state::ShellState;

    fn project(state: &mut ShellState) {
        state.fs.create_dir_all("/home/user/proj/src").unwrap();
        state
            .fs
            .write_file("/home/user/proj/notes.txt", &"note ".repeat(100))
            .unwrap();
        state.fs.write_file("/home/user/proj/src/a.rs", "fn a() {}").unwrap();
    }

    #[test]
    fn test_tar_create_list_extract() {
        let mut state = ShellState::new();
        project(&mut state);

        let out = run_plain(&mut state, "tar -cf proj.tar proj");
        assert_eq!(out, vec!["Created archive: proj.tar (4 items, 509 bytes)"]);

        assert_eq!(
            run_plain(&mut state, "tar -tvf proj.tar"),
            vec![
                "proj/",
                "proj/notes.txt (500 bytes)",
                "proj/src/",
                "proj/src/a.rs (9 bytes)",
            ]
        );

        run(&mut state, "mkdir out").unwrap();
        run(&mut state, "cd out").unwrap();
        let out = run_plain(&mut state, "tar -xf ../proj.tar");
        assert_eq!(out, vec!["Extracted 4 items from ../proj.tar"]);
        assert_eq!(
            state.fs.read_file("/home/user/out/proj/src/a.rs").unwrap(),
            "fn a() {}"
        );
    }

    #[test]
    fn test_tar_verbose_create() {
        let mut state = ShellState::new();
        project(&mut state);
        let out = run_plain(&mut state, "tar -cvf p.tar proj/src");
        assert_eq!(out, vec!["proj/src/", "proj/src/a.rs"]);
    }

    #[test]
    fn test_tar_errors() {
        let mut state = ShellState::new();
        assert!(run(&mut state, "tar x").unwrap_err().to_string().starts_with("usage: tar"));
        assert_eq!(
            run(&mut state, "tar -c a.tar").unwrap_err().to_string(),
            "no files specified for archive"
        );
        assert_eq!(
            run(&mut state, "tar -cf a.tar ghost").unwrap_err().to_string(),
            "ghost: No such file or directory"
        );
        assert!(!state.fs.exists("/home/user/a.tar"));
        assert_eq!(
            run(&mut state, "tar -xf Desktop/document.txt").unwrap_err().to_string(),
            "Desktop/document.txt: invalid archive format"
        );
        assert_eq!(
            run(&mut state, "tar -q a.tar").unwrap_err().to_string(),
            "you must specify either -c (create), -x (extract), or -t (list)"
        );
    }

    #[test]
    fn test_zip_round_trip() {
        let mut state = ShellState::new();
        project(&mut state);

        let out = run_plain(&mut state, "zip -r p.zip proj");
        assert_eq!(out[0], "  adding: proj/");
        assert!(out[1].starts_with("  adding: proj/notes.txt (deflated "));
        assert_eq!(out[3], "  adding: proj/src/a.rs (stored)");
        assert!(out.last().unwrap().starts_with("Created: p.zip (4 files, 509 → "));

        let listing = run_plain(&mut state, "unzip -l p.zip");
        assert_eq!(listing[0], "Archive:  p.zip");
        assert!(listing[4].ends_with("proj/src/a.rs (stored)"));
        assert_eq!(listing[5], "--------                  -------");

        state.fs.remove("/home/user/proj", true, false).unwrap();
        let out = run_plain(&mut state, "unzip p.zip");
        assert_eq!(out[1], "  creating: proj/");
        assert_eq!(out[2], "  inflating: proj/notes.txt");
        assert_eq!(out.last().unwrap(), "Extracted 4 files from p.zip");
        assert_eq!(
            state.fs.read_file("/home/user/proj/notes.txt").unwrap(),
            "note ".repeat(100)
        );
    }

    #[test]
    fn test_listing_leaves_fs_untouched() {
        let mut state = ShellState::new();
        project(&mut state);
        run(&mut state, "tar -cf p.tar proj").unwrap();
        run(&mut state, "zip -r p.zip proj").unwrap();
        let before = state.fs.clone();

        assert_eq!(run_plain(&mut state, "tar -tf p.tar").len(), 4);
        assert_eq!(state.fs, before);
        assert_eq!(run_plain(&mut state, "unzip -l p.zip")[0], "Archive:  p.zip");
        assert_eq!(state.fs, before);
    }

    #[test]
    fn test_zip_errors() {
        let mut state = ShellState::new();
        assert_eq!(
            run(&mut state, "zip d.zip Desktop").unwrap_err().to_string(),
            "Desktop: is a directory (use -r for recursive)"
        );
        assert_eq!(
            run(&mut state, "zip -r d.zip").unwrap_err().to_string(),
            "missing archive name or files"
        );
        assert_eq!(
            run(&mut state, "unzip nothing.zip").unwrap_err().to_string(),
            "cannot find or open nothing.zip"
        );
        run(&mut state, "tar -cf t.tar Desktop").unwrap();
        assert_eq!(
            run(&mut state, "unzip t.tar").unwrap_err().to_string(),
            "t.tar: not a valid zip archive"
        );
    }
}
