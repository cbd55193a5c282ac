pub mod assembler;
pub mod raster;

pub use assembler::ReportAssembler;
pub use raster::PlottersRasterizer;
