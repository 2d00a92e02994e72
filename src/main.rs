use ndvoronoi::*;

fn main() {
    let cities = [
        ("Cordoba", [20.0, 5.0]),
        ("Huelva", [1.0, 1.0]),
        ("Cadiz", [5.0, -13.0]),
        ("Malaga", [20.0, -20.0]),
        ("Sevilla", [10.0, -10.0]),
    ];

    let mut diagram: Diagram<&str> = Diagram::new(2);
    for (name, point) in cities {
        if let Err(e) = diagram.insert_with_data(&point, name) {
            eprintln!("{name}: {e}");
        }
    }

    println!("{:?}", diagram.statistics());

    for region in diagram.regions() {
        let neighbours: Vec<&str> = region
            .neighbours()
            .filter_map(|id| diagram.site(id).and_then(|s| s.data().copied()))
            .collect();
        println!(
            "{} {:?} unbounded={} neighbours={neighbours:?}",
            region.data().copied().unwrap_or("?"),
            region.coordinates(),
            region.is_unbounded(),
        );
    }

    for vertex in diagram.vertices().filter(|v| !v.is_infinite()) {
        println!("vertex {:?} r={:?}", vertex.coordinates(), vertex.radius());
    }

    if let Ok(Some(region)) = diagram.locate(&[4.0, 4.0]) {
        println!("(4, 4) is in {:?}", region.data());
    }
}
