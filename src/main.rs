use overprint::{DEFAULT_TEMPLATE_ID, EngineConfig, OrderDocument, OverprintError, Overprinter};
use std::env;
use std::fs;

/// Renders an order JSON file onto its template.
fn main() -> Result<(), OverprintError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Overlays an order onto its preprinted template PDF.");
        eprintln!();
        eprintln!(
            "Usage: {} <path/to/order.json> <path/to/output.pdf> [template_id]",
            args.first().map(String::as_str).unwrap_or("overprint")
        );
        eprintln!();
        eprintln!("Assets are read from $OVERPRINT_ASSETS_DIR (default ./assets):");
        eprintln!("  layouts/<template_id>.json[c], templates/<file>.pdf, fonts/<font>.ttf");
        std::process::exit(1);
    }

    let order_path = &args[1];
    let output_path = &args[2];
    let template_id = args.get(3).map(String::as_str).unwrap_or(DEFAULT_TEMPLATE_ID);

    println!("Loading order from {}", order_path);
    let order = OrderDocument::from_json(&fs::read_to_string(order_path)?)?;

    let engine = Overprinter::new(EngineConfig::from_env());
    println!(
        "Rendering {} item(s) with layout '{}'...",
        order.items.len(),
        template_id
    );
    let pdf = engine.build(&order.header, &order.items, template_id)?;

    fs::write(output_path, pdf)?;
    println!("Successfully generated {}", output_path);
    Ok(())
}
