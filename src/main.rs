use clap::{arg,crate_version,Command};
use huffpack::{huffman,Error};
use std::path::{Path,PathBuf};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

/// `dir/name.ext` becomes `dir/name.ext.huff`
fn default_archive_path(path_in: &str) -> PathBuf {
    PathBuf::from([path_in,".huff"].concat())
}

/// `dir/name.ext` becomes `dir/name_decomp.ext`, where `name` is everything
/// before the last dot, so `dir/data.txt.huff` becomes `dir/data.txt_decomp.huff`
fn default_expanded_path(path_in: &Path) -> PathBuf {
    let stem = path_in.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path_in.extension() {
        Some(ext) => format!("{}_decomp.{}",stem,ext.to_string_lossy()),
        None => format!("{}_decomp",stem)
    };
    path_in.with_file_name(name)
}

/// `dir/name.ext` becomes `dir/name_freq.txt`
fn frequency_dump_path(path_out: &Path) -> PathBuf {
    let stem = path_out.file_stem().unwrap_or_default().to_string_lossy();
    path_out.with_file_name(format!("{}_freq.txt",stem))
}

fn write_frequency_dump(table: &huffpack::tools::freq_table::FrequencyTable,path: &Path) -> STDRESULT {
    let mut dump = match std::fs::File::create(path) {
        Ok(f) => std::io::BufWriter::new(f),
        Err(source) => return Err(Box::new(Error::FileOpen { path: path.display().to_string(), source }))
    };
    table.write_dump(&mut dump)?;
    std::io::Write::flush(&mut dump)?;
    log::info!("wrote {} table entries to {}",table.len(),path.display());
    Ok(())
}

fn run() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `huffpack compress my_file.txt my_file.huff`
Expand:        `huffpack decompress my_file.huff my_file.txt`
With table:    `huffpack decompress_with_freq my_file.huff my_file.txt`";

    let mut main_cmd = Command::new("huffpack")
        .about("Compress and expand with static Huffman codes")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(<INPUT> "input path"))
        .arg(arg!([OUTPUT] "output path, defaults to input path with .huff appended"))
        .about("compress a file"));
    main_cmd = main_cmd.subcommand(Command::new("decompress")
        .arg(arg!(<INPUT> "input path"))
        .arg(arg!([OUTPUT] "output path, defaults to <stem>_decomp.<ext>"))
        .about("expand an archive"));
    main_cmd = main_cmd.subcommand(Command::new("decompress_with_freq")
        .arg(arg!(<INPUT> "input path"))
        .arg(arg!([OUTPUT] "output path, defaults to <stem>_decomp.<ext>"))
        .about("expand an archive and write its frequency table to <output stem>_freq.txt"));
    main_cmd = main_cmd.subcommand_required(true).arg_required_else_help(true);

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("INPUT").expect(RCH);
        let path_out = match cmd.get_one::<String>("OUTPUT") {
            Some(p) => PathBuf::from(p),
            None => default_archive_path(path_in)
        };
        let (in_size,out_size) = huffman::compress_file(path_in,&path_out)?;
        log::info!("compressed {} into {}",in_size,out_size);
        println!("Compression completed: {}",path_out.display());
    }

    for (name,with_freq) in [("decompress",false),("decompress_with_freq",true)] {
        if let Some(cmd) = matches.subcommand_matches(name) {
            let path_in = cmd.get_one::<String>("INPUT").expect(RCH);
            let path_out = match cmd.get_one::<String>("OUTPUT") {
                Some(p) => PathBuf::from(p),
                None => default_expanded_path(Path::new(path_in))
            };
            let (in_size,out_size,table) = huffman::expand_file(path_in,&path_out)?;
            log::info!("expanded {} into {}",in_size,out_size);
            if with_freq {
                write_frequency_dump(&table,&frequency_dump_path(&path_out))?;
                println!("Decompression with frequencies completed: {}",path_out.display());
            } else {
                println!("Decompression completed: {}",path_out.display());
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}",e);
        std::process::exit(1);
    }
}

#[test]
fn derived_paths() {
    assert_eq!(default_archive_path("dir/notes.txt"),PathBuf::from("dir/notes.txt.huff"));
    assert_eq!(default_expanded_path(Path::new("dir/notes.txt.huff")),PathBuf::from("dir/notes.txt_decomp.huff"));
    assert_eq!(default_expanded_path(Path::new("dir/notes")),PathBuf::from("dir/notes_decomp"));
    assert_eq!(frequency_dump_path(Path::new("dir/notes.txt")),PathBuf::from("dir/notes_freq.txt"));
}
