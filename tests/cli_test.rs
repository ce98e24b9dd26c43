use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const HELLO: &str = "hello world";

#[test]
fn compress_and_decompress() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("hello.txt");
    let cmp_path = temp_dir.path().join("hello.huff");
    let out_path = temp_dir.path().join("hello_out.txt");
    std::fs::write(&in_path,HELLO)?;
    Command::cargo_bin("huffpack")?
        .arg("compress").arg(&in_path).arg(&cmp_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Compression completed"));
    Command::cargo_bin("huffpack")?
        .arg("decompress").arg(&cmp_path).arg(&out_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Decompression completed"));
    assert_eq!(std::fs::read(&out_path)?,HELLO.as_bytes().to_vec());
    Ok(())
}

#[test]
fn default_output_paths() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("notes.txt");
    std::fs::write(&in_path,"aaaaaaaaaabbbbbc")?;
    Command::cargo_bin("huffpack")?
        .arg("compress").arg(&in_path)
        .assert()
        .success();
    let cmp_path = temp_dir.path().join("notes.txt.huff");
    assert!(cmp_path.exists());
    Command::cargo_bin("huffpack")?
        .arg("decompress").arg(&cmp_path)
        .assert()
        .success();
    let out_path = temp_dir.path().join("notes.txt_decomp.huff");
    assert_eq!(std::fs::read(&out_path)?,"aaaaaaaaaabbbbbc".as_bytes().to_vec());
    Ok(())
}

#[test]
fn decompress_with_frequencies() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("hello.txt");
    let cmp_path = temp_dir.path().join("hello.huff");
    let out_path = temp_dir.path().join("restored.txt");
    let freq_path = temp_dir.path().join("restored_freq.txt");
    std::fs::write(&in_path,HELLO)?;
    Command::cargo_bin("huffpack")?
        .arg("compress").arg(&in_path).arg(&cmp_path)
        .assert()
        .success();
    Command::cargo_bin("huffpack")?
        .arg("decompress_with_freq").arg(&cmp_path).arg(&out_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Decompression with frequencies completed"));
    assert_eq!(std::fs::read(&out_path)?,HELLO.as_bytes().to_vec());
    let dump = std::fs::read_to_string(&freq_path)?;
    let expected = [
        "Symbol:  , Frequency: 1",
        "Symbol: d, Frequency: 1",
        "Symbol: e, Frequency: 1",
        "Symbol: h, Frequency: 1",
        "Symbol: l, Frequency: 3",
        "Symbol: o, Frequency: 2",
        "Symbol: r, Frequency: 1",
        "Symbol: w, Frequency: 1"
    ];
    assert_eq!(dump.lines().collect::<Vec<&str>>(),expected.to_vec());
    Ok(())
}

#[test]
fn empty_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("empty.txt");
    let cmp_path = temp_dir.path().join("empty.huff");
    std::fs::write(&in_path,"")?;
    Command::cargo_bin("huffpack")?
        .arg("compress").arg(&in_path).arg(&cmp_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: input is empty"));
    assert!(!cmp_path.exists());
    Ok(())
}

#[test]
fn corrupt_header_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let cmp_path = temp_dir.path().join("broken.huff");
    let out_path = temp_dir.path().join("broken.txt");
    let freq_path = temp_dir.path().join("broken_freq.txt");
    // declares 3 entries, holds 1
    std::fs::write(&cmp_path,[3,0,0,0,b'a',7,0,0,0,0,0,0,0])?;
    Command::cargo_bin("huffpack")?
        .arg("decompress_with_freq").arg(&cmp_path).arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupted frequency table"));
    assert!(!freq_path.exists());
    Ok(())
}

#[test]
fn missing_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    Command::cargo_bin("huffpack")?
        .arg("compress").arg(temp_dir.path().join("nothing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not open"));
    Ok(())
}

#[test]
fn unknown_command_fails() -> STDRESULT {
    Command::cargo_bin("huffpack")?
        .arg("squash").arg("file.txt")
        .assert()
        .failure();
    Ok(())
}
