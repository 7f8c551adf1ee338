use winfs_rs::PathInfo;

fn main() -> anyhow::Result<()> {
    let inputs: Vec<String> = std::env::args().skip(1).collect();
    let inputs = if inputs.is_empty() {
        vec![
            r"C:\Users\.\alice\..\bob\notes.txt".to_string(),
            r"\\server\share\dir\file.tar.gz".to_string(),
            r"\\?\Volume{5d1a2f3e-0b4c-11ee-9a7b-806e6f6e6963}\data".to_string(),
            r"..\relative\path...".to_string(),
        ]
    } else {
        inputs
    };

    for input in inputs {
        let path = match PathInfo::new(&input) {
            Ok(path) => path,
            Err(err) => {
                eprintln!("{input}: {err}");
                continue;
            }
        };

        println!("{input}");
        println!("  form={:?}, normalized={}", path.root_form(), path.full_path());
        println!(
            "  root={:?}, directory={:?}, file_name={:?}, extension={:?}",
            path.root(),
            path.directory_name(),
            path.file_name(),
            path.extension()
        );
        println!("  parent={}", path.parent());
    }

    Ok(())
}
