//! Irish towns for realistic fixtures.
//!
//! Coordinates from OpenStreetMap town nodes; populations rounded from the
//! 2016 census urban-area counts.

/// A named settlement with coordinates and population.
#[derive(Debug, Clone)]
pub struct Town {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub population: f64,
}

impl Town {
    pub const fn new(name: &'static str, lat: f64, lng: f64, population: f64) -> Self {
        Self { name, lat, lng, population }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Cities
// ============================================================================

pub const CITIES: &[Town] = &[
    Town::new("Dublin", 53.3498, -6.2603, 1_173_179.0),
    Town::new("Cork", 51.8985, -8.4756, 208_669.0),
    Town::new("Limerick", 52.6638, -8.6267, 94_192.0),
    Town::new("Galway", 53.2707, -9.0568, 79_934.0),
    Town::new("Waterford", 52.2593, -7.1101, 53_504.0),
];

// ============================================================================
// Large towns
// ============================================================================

pub const LARGE_TOWNS: &[Town] = &[
    Town::new("Drogheda", 53.7179, -6.3561, 40_956.0),
    Town::new("Swords", 53.4597, -6.2181, 39_248.0),
    Town::new("Dundalk", 54.0090, -6.4049, 39_004.0),
    Town::new("Bray", 53.2028, -6.0983, 32_600.0),
    Town::new("Navan", 53.6528, -6.6814, 30_173.0),
    Town::new("Kilkenny", 52.6541, -7.2448, 26_512.0),
    Town::new("Ennis", 52.8436, -8.9864, 25_276.0),
    Town::new("Carlow", 52.8408, -6.9261, 24_272.0),
    Town::new("Tralee", 52.2713, -9.6999, 23_691.0),
    Town::new("Portlaoise", 53.0344, -7.2998, 22_050.0),
    Town::new("Athlone", 53.4239, -7.9407, 21_349.0),
    Town::new("Mullingar", 53.5259, -7.3381, 20_928.0),
    Town::new("Wexford", 52.3369, -6.4633, 20_188.0),
    Town::new("Letterkenny", 54.9558, -7.7342, 19_274.0),
    Town::new("Sligo", 54.2766, -8.4761, 19_199.0),
];

/// Every fixture town.
pub fn all_towns() -> Vec<Town> {
    CITIES.iter().chain(LARGE_TOWNS).cloned().collect()
}
