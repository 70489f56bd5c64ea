/// Superstore Summary Example
///
/// This example demonstrates:
/// - Loading an orders CSV with the superstore preset
/// - Filtering by region (an empty selection keeps everything)
/// - Yearly totals with growth, category market share and business KPIs

use dashtable::report::{business_kpis, category, yearly};
use dashtable::{load_str, FilterSpec, LoadOptions, SortKey};

const ORDERS: &str = "Order ID,Order Date,Ship Mode,Customer ID,Segment,State,Region,Category,Sub-Category,Sales\n\
    CA-1001,11/8/2015,Second Class,CG-12520,Consumer,Kentucky,South,Furniture,Bookcases,261.96\n\
    CA-1001,11/8/2015,Second Class,CG-12520,Consumer,Kentucky,South,Furniture,Chairs,731.94\n\
    CA-1002,6/12/2015,Second Class,DV-13045,Corporate,California,West,Office Supplies,Labels,14.62\n\
    US-1003,10/11/2016,Standard Class,SO-20335,Consumer,Florida,South,Furniture,Tables,957.58\n\
    US-1003,10/11/2016,Standard Class,SO-20335,Consumer,Florida,South,Office Supplies,Storage,22.37\n\
    CA-1004,6/9/2016,Standard Class,BH-11710,Consumer,California,West,Technology,Phones,907.15\n\
    CA-1005,4/15/2017,Standard Class,ZD-21925,Consumer,Texas,Central,Office Supplies,Binders,18.50\n\
    CA-1006,12/5/2017,First Class,AA-10480,Home Office,New York,East,Technology,Accessories,114.90\n\
    CA-1007,11/22/2018,Same Day,IM-15070,Consumer,Ohio,East,Technology,Phones,1097.54\n";

fn main() -> dashtable::Result<()> {
    println!("=== dashtable Superstore Summary Example ===\n");

    // 1. Load
    println!("1. Loading orders...");
    let dataset = load_str("superstore", ORDERS, &LoadOptions::superstore())?;
    let derived: Vec<&str> = dataset.capabilities().derived().collect();
    println!("   {} orders, derived columns: {}\n", dataset.base().len(), derived.join(", "));

    // 2. Nothing selected yet: every region passes
    let regions: Vec<String> = Vec::new();
    let selected = dataset.filter(&[FilterSpec::one_of("Region", regions)])?;
    println!("2. Empty region selection keeps {} rows\n", selected.base().len());

    // 3. Yearly totals with growth
    println!("3. Yearly sales:");
    let years = yearly(selected.base())?;
    for row in 0..years.len() {
        println!(
            "   {}: {:>9} (growth {})",
            years.get_value(row, "Order Year")?,
            years.get_value(row, "Total_Sales")?,
            years.get_value(row, "Sales_Growth")?
        );
    }

    // 4. Category market share, largest first
    println!("\n4. Category market share:");
    let categories = dashtable::rank(&category(selected.base())?, &[SortKey::descending("Market_Share")], None, None)?;
    for row in 0..categories.len() {
        println!(
            "   {:<16} {:.1}%",
            categories.get_value(row, "Category")?,
            categories.get_value(row, "Market_Share")?.as_f64().unwrap_or(0.0)
        );
    }

    // 5. KPIs for the West region only
    println!("\n5. West region KPIs:");
    let west = dataset.filter(&[FilterSpec::one_of("Region", ["West"])])?;
    let kpis = business_kpis(west.base())?;
    println!("{}", serde_json::to_string_pretty(&kpis)?);

    println!("\n=== Example Complete ===");
    Ok(())
}
