// Example: read a hand-written config, tweak it, print it back as JSON

use laxdoc::{parse, Error, WriteOptions};

fn main() -> Result<(), Error> {
    let text = r#"
        # service settings
        {
            name: gateway,
            listen: { host: 0.0.0.0, port: 8080 },
            upstreams: (alpha beta),
            home: `${HOME}`,
        }
    "#;
    println!("Input: {}", text);

    let mut root = parse(text)?;
    println!("port = {}", root.select_integer("listen.port"));

    if let Some(listen) = root.select_mut("listen").and_then(|v| v.as_object_mut()) {
        listen.set_integer(b"port", 9090)?;
        listen.set_bool(b"tls", true)?;
    }

    let options = WriteOptions::pretty().with_sort_keys(true);
    println!("{}", laxdoc::to_string(&root, &options)?);
    Ok(())
}
