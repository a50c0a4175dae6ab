//! Print a summary of a depot index file.

use depot_schema::IndexFile;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let path = if args.len() > 1 {
        args[1].clone()
    } else {
        let home = std::env::var("HOME")?;
        format!("{home}/.depot/index.json")
    };

    let index = IndexFile::parse(&std::fs::read_to_string(&path)?)?;
    println!("Index Version: {}", index.version);
    println!("Increment: {}", index.increment);
    println!("Written At: {}", index.date);
    println!("Descriptors ({}):", index.descriptors.len());

    for rd in &index.descriptors {
        let repos: Vec<&str> = rd.repositories.iter().map(String::as_str).collect();
        println!(" - {rd} [{}] {}", repos.join(", "), rd.id);
    }

    Ok(())
}
