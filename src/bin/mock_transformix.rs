//! Mock transformix binary for integration testing
//!
//! Implements the transformix command-line contract (banners, option
//! errors, result file names) and applies translation transforms to
//! MetaImage images and point lists, so the harness can be exercised
//! without a real elastix build.
//!
//! `MOCK_TRANSFORMIX_FAULT` injects a defect for negative tests:
//! `version`, `shift`, `points`, `stderr` or `crash`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use transformix_conformance::image::{read_image, write_image, ElementType, Image, ImageDescriptor};

const PROGRAM: &str = "transformix";
const VERSION: &str = "5.0.1";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let fault = std::env::var("MOCK_TRANSFORMIX_FAULT").unwrap_or_default();

    if fault == "stderr" {
        eprintln!("warning: mock diagnostics enabled");
    }

    match run(&args, &fault) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::from(1)
        }
    }
}

fn run(args: &[String], fault: &str) -> Result<(), String> {
    if args.is_empty() {
        println!(
            "Use \"{} --help\" for information about {}-usage.",
            PROGRAM, PROGRAM
        );
        return Ok(());
    }

    match args[0].as_str() {
        "--help" | "-help" => {
            print_help();
            return Ok(());
        }
        "--version" => {
            let version = if fault == "version" { "5.0.0" } else { VERSION };
            println!("{} version: {}", PROGRAM, version);
            return Ok(());
        }
        "--extended-version" => {
            println!("{} version: {}", PROGRAM, VERSION);
            println!("Git revision SHA: 0000000000000000000000000000000000000000");
            println!("Git revision date: Thu Jan 1 00:00:00 1970 +0000");
            println!("Memory address size: {}", usize::BITS);
            println!("CMake version: 3.16.3");
            println!("ITK version: 5.1.0");
            return Ok(());
        }
        _ => {}
    }

    let options = parse_options(args)?;

    let out = options
        .get("-out")
        .ok_or("ERROR: No CommandLine option \"-out\" given!")?;
    let tp = options
        .get("-tp")
        .ok_or("ERROR: No CommandLine option \"-tp\" given!")?;
    if !["-in", "-def", "-jac", "-jacmat"]
        .iter()
        .any(|k| options.contains_key(*k))
    {
        return Err("ERROR: At least one of the CommandLine options \"-in\", \"-def\", \"-jac\", or \"-jacmat\" should be given!".to_string());
    }

    if fault == "crash" {
        return Err("Segmentation fault (simulated)".to_string());
    }

    let out = PathBuf::from(out);
    if !out.is_dir() {
        return Err(format!(
            "ERROR: the output directory \"{}\" does not exist.",
            out.display()
        ));
    }

    let params = TransformParameters::load(Path::new(tp))?;
    let mut translation = params.translation.clone();
    if fault == "shift" {
        translation[0] += 1.0;
    }

    if let Some(input) = options.get("-in") {
        let image = read_image(Path::new(input)).map_err(|e| format!("ERROR: {}", e))?;
        if image.descriptor.dimension != translation.len() {
            return Err(format!(
                "ERROR: {}-D transform cannot be applied to a {}-D image",
                translation.len(),
                image.descriptor.dimension
            ));
        }
        let result = translate_image(&image, &params, &translation);
        let name = format!("result.{}", params.result_format);
        write_image(&out.join(name), &result).map_err(|e| format!("ERROR: {}", e))?;
    }

    if let Some(points) = options.get("-def") {
        let text = transform_points(Path::new(points), &params, &translation)?;
        let text = if fault == "points" {
            text.replace('\n', "\r\n")
        } else {
            text
        };
        std::fs::write(out.join("outputpoints.txt"), text)
            .map_err(|e| format!("ERROR: cannot write outputpoints.txt: {}", e))?;
    }

    if options.contains_key("-jac") || options.contains_key("-jacmat") {
        // A translation has unit Jacobian everywhere; nothing else to write
        println!("Jacobian of a translation is the identity");
    }

    Ok(())
}

fn print_help() {
    println!("transformix applies a transform on an input image and/or generates a deformation field.");
    println!("The transform is specified in the transform-parameter file.");
    println!();
    println!("Call transformix from the command line with mandatory arguments:");
    println!("  -out      output directory");
    println!("  -tp       transform-parameter file, only 1");
    println!();
    println!("Optional extra commands:");
    println!("  -in       input image to deform");
    println!("  -def      file containing input-image points");
    println!("  -jac      use \"-jac all\" to generate an image with the determinant of the spatial Jacobian");
    println!("  -jacmat   use \"-jacmat all\" to generate an image with the spatial Jacobian matrix");
}

fn parse_options(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut options = HashMap::new();
    let mut iter = args.iter();
    while let Some(key) = iter.next() {
        if !key.starts_with('-') {
            return Err(format!("ERROR: unexpected argument \"{}\"", key));
        }
        let value = iter
            .next()
            .ok_or_else(|| format!("ERROR: No value given for option \"{}\"", key))?;
        options.insert(key.clone(), value.clone());
    }
    Ok(options)
}

/// The subset of an elastix transform-parameter file the mock understands
struct TransformParameters {
    translation: Vec<f64>,
    size: Option<Vec<usize>>,
    spacing: Option<Vec<f64>>,
    origin: Option<Vec<f64>>,
    direction: Option<Vec<f64>>,
    default_pixel_value: f64,
    pixel_type: Option<ElementType>,
    result_format: String,
}

impl TransformParameters {
    fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            format!(
                "ERROR: cannot read transform parameter file \"{}\": {}",
                path.display(),
                e
            )
        })?;

        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let line = line.split("//").next().unwrap_or("").trim();
            let Some(body) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) else {
                continue;
            };
            let mut tokens = body.split_whitespace();
            if let Some(key) = tokens.next() {
                entries.insert(
                    key.to_string(),
                    tokens.map(|t| t.trim_matches('"').to_string()).collect(),
                );
            }
        }

        let transform = entries
            .get("Transform")
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_default();
        if transform != "TranslationTransform" {
            return Err(format!(
                "ERROR: mock transformix only supports TranslationTransform, got \"{}\"",
                transform
            ));
        }

        let numbers = |key: &str| -> Result<Option<Vec<f64>>, String> {
            entries
                .get(key)
                .map(|v| {
                    v.iter()
                        .map(|t| {
                            t.parse::<f64>()
                                .map_err(|_| format!("ERROR: invalid {} value \"{}\"", key, t))
                        })
                        .collect()
                })
                .transpose()
        };

        let translation = numbers("TransformParameters")?
            .ok_or("ERROR: missing TransformParameters")?;

        let pixel_type = entries
            .get("ResultImagePixelType")
            .map(|v| v.join(" "))
            .map(|t| match t.as_str() {
                "unsigned char" => Ok(ElementType::UChar),
                "char" => Ok(ElementType::Char),
                "unsigned short" => Ok(ElementType::UShort),
                "short" => Ok(ElementType::Short),
                "int" => Ok(ElementType::Int),
                "float" => Ok(ElementType::Float),
                "double" => Ok(ElementType::Double),
                other => Err(format!("ERROR: unsupported ResultImagePixelType \"{}\"", other)),
            })
            .transpose()?;

        Ok(Self {
            translation,
            size: numbers("Size")?.map(|v| v.iter().map(|x| *x as usize).collect()),
            spacing: numbers("Spacing")?,
            origin: numbers("Origin")?,
            direction: numbers("Direction")?,
            default_pixel_value: numbers("DefaultPixelValue")?
                .and_then(|v| v.first().copied())
                .unwrap_or(0.0),
            pixel_type,
            result_format: entries
                .get("ResultImageFormat")
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "mhd".to_string()),
        })
    }
}

/// Nearest-neighbour resampling of `input` through `x -> x + t`
///
/// The output grid comes from the parameter file where given, otherwise
/// from the input image. Direction is assumed to be the identity.
fn translate_image(input: &Image, params: &TransformParameters, translation: &[f64]) -> Image {
    let src = &input.descriptor;
    let descriptor = ImageDescriptor {
        dimension: src.dimension,
        size: params.size.clone().unwrap_or_else(|| src.size.clone()),
        spacing: params.spacing.clone().unwrap_or_else(|| src.spacing.clone()),
        origin: params.origin.clone().unwrap_or_else(|| src.origin.clone()),
        direction: params
            .direction
            .clone()
            .unwrap_or_else(|| src.direction.clone()),
        element_type: params.pixel_type.unwrap_or(src.element_type),
        components: 1,
    };

    let mut output = Image::zeros(descriptor);
    for linear in 0..output.descriptor.pixel_count() {
        let index = output.descriptor.grid_index(linear);
        let source_index: Option<Vec<usize>> = index
            .iter()
            .enumerate()
            .map(|(axis, &i)| {
                let d = &output.descriptor;
                let physical = d.origin[axis] + d.spacing[axis] * i as f64 + translation[axis];
                let continuous = (physical - src.origin[axis]) / src.spacing[axis];
                let rounded = continuous.round();
                (rounded >= 0.0 && (rounded as usize) < src.size[axis]).then_some(rounded as usize)
            })
            .collect();

        output.pixels[linear] = source_index
            .and_then(|idx| input.get(&idx))
            .unwrap_or(params.default_pixel_value);
    }
    output
}

/// Map every point of an elastix point file through `x -> x + t`
fn transform_points(
    path: &Path,
    params: &TransformParameters,
    translation: &[f64],
) -> Result<String, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("ERROR: cannot read point file \"{}\": {}", path.display(), e))?;
    let mut tokens = text.split_whitespace();

    let first = tokens.next().ok_or("ERROR: empty point file")?;
    let (is_index, count) = match first {
        "point" | "index" => (
            first == "index",
            tokens.next().ok_or("ERROR: missing point count")?,
        ),
        count => (false, count),
    };
    let count: usize = count
        .parse()
        .map_err(|_| format!("ERROR: invalid point count \"{}\"", count))?;

    let dim = translation.len();
    let origin = params.origin.clone().unwrap_or_else(|| vec![0.0; dim]);
    let spacing = params.spacing.clone().unwrap_or_else(|| vec![1.0; dim]);

    let values: Vec<f64> = tokens
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("ERROR: invalid coordinate \"{}\"", t))
        })
        .collect::<Result<_, _>>()?;
    if values.len() != count * dim {
        return Err(format!(
            "ERROR: expected {} coordinates, found {}",
            count * dim,
            values.len()
        ));
    }

    let join_f = |v: &[f64]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(" ");
    let join_i = |v: &[i64]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(" ");
    let to_index = |p: &[f64]| -> Vec<i64> {
        p.iter()
            .enumerate()
            .map(|(a, x)| ((x - origin[a]) / spacing[a]).round() as i64)
            .collect()
    };

    let mut out = String::new();
    for (n, raw) in values.chunks(dim).enumerate() {
        let input: Vec<f64> = if is_index {
            raw.iter()
                .enumerate()
                .map(|(a, i)| origin[a] + spacing[a] * i)
                .collect()
        } else {
            raw.to_vec()
        };
        let output: Vec<f64> = input.iter().zip(translation).map(|(x, t)| x + t).collect();
        let deformation: Vec<f64> = output.iter().zip(&input).map(|(o, i)| o - i).collect();

        let _ = writeln!(
            out,
            "Point\t{}\t; InputIndex = [ {} ]\t; InputPoint = [ {} ]\t; OutputIndexFixed = [ {} ]\t; OutputPoint = [ {} ]\t; Deformation = [ {} ]",
            n,
            join_i(&to_index(&input)),
            join_f(&input),
            join_i(&to_index(&output)),
            join_f(&output),
            join_f(&deformation)
        );
    }
    Ok(out)
}
