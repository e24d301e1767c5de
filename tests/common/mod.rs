//! Shared builders for message-level tests. All buffers are synthesized;
//! no fixture files.
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use grib2_codec::sections::sect1::Identification;
use grib2_codec::sections::sect3::{
    BasicAngle, Grid, Grid0, Grid40, GridDefinition, GridHeader, ScaledValue,
};
use grib2_codec::sections::sect4::{Product, Product0, ProductDefinition, Surface};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn identification() -> Identification {
    Identification {
        centre_id: 7,
        subcentre_id: 0,
        master_table_version: 2,
        local_table_version: 1,
        ref_time_significance: 1,
        ref_time: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        prod_status: 0,
        data_type: 1,
    }
}

fn spherical_earth() -> GridHeader {
    GridHeader {
        earth_shape: 6,
        spherical_radius: ScaledValue { scale: 0, value: 0 },
        major_axis: ScaledValue { scale: 0, value: 0 },
        minor_axis: ScaledValue { scale: 0, value: 0 },
    }
}

pub fn regular_latlon(nx: u32, ny: u32) -> GridDefinition {
    GridDefinition {
        source: 0,
        num_points: (nx * ny) as usize,
        optional_list_entry_octets: 0,
        optional_list_interpretation: 0,
        template_number: 0,
        grid: Grid::Grid0(Grid0 {
            header: spherical_earth(),
            n_i: nx,
            n_j: ny,
            initial_prod_basic_angle: BasicAngle {
                basic_angle: 0,
                basic_angle_sub: 0,
            },
            la1: 50_000_000,
            lo1: 0,
            resolution_and_component_flags: 48,
            la2: 48_000_000,
            lo2: 3_000_000,
            d_i: 1_000_000,
            d_j: 1_000_000,
            scanning_mode: 0,
        }),
        points_per_row: None,
    }
}

pub fn reduced_gaussian(rows: &[u32]) -> GridDefinition {
    GridDefinition {
        source: 0,
        num_points: rows.iter().map(|n| *n as usize).sum(),
        optional_list_entry_octets: 2,
        optional_list_interpretation: 1,
        template_number: 40,
        grid: Grid::Grid40(Grid40 {
            header: spherical_earth(),
            n_i: None,
            n_j: rows.len() as u32,
            initial_prod_basic_angle: BasicAngle {
                basic_angle: 0,
                basic_angle_sub: 0,
            },
            la1: 45_000_000,
            lo1: 0,
            resolution_and_component_flags: 48,
            la2: -45_000_000,
            lo2: 359_000_000,
            d_i: None,
            n_parallels: (rows.len() / 2).max(1) as u32,
            scanning_mode: 0,
        }),
        points_per_row: Some(rows.to_vec().into_boxed_slice()),
    }
}

pub fn temperature_at_2m() -> ProductDefinition {
    ProductDefinition {
        num_coordinates: 0,
        template_number: 0,
        product: Product::Product0(Product0 {
            parameter_category: 0,
            parameter_number: 0,
            process_type: 2,
            background_process: 0,
            analysis_process: 96,
            cutoff_hours: 0,
            cutoff_minutes: 0,
            time_unit: 1,
            forecast_time_value: 6,
            first_surface: Surface {
                surface_type: 103,
                scale_factor: 0,
                scaled_value: 2,
            },
            second_surface: Surface {
                surface_type: 255,
                scale_factor: 0,
                scaled_value: 0,
            },
        }),
        coordinates: None,
    }
}
