/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
use std::io::Read;
use tar_entry::{default_encoding, TarEntry, TarFormat, BLOCKSIZE};

/// Prints the first entry of the Tar archive given as argument.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // log: not mandatory
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: dump_header <archive.tar>")?;
    let mut block = [0; BLOCKSIZE];
    std::fs::File::open(path)?.read_exact(&mut block)?;

    let entry = TarEntry::from_header(&block, default_encoding())?;
    println!("format: {:?}", TarFormat::detect(&block));
    println!("{entry:#?}");
    println!("directory: {}", entry.is_directory());
    println!("checksum ok: {}", entry.is_checksum_ok());
    Ok(())
}
