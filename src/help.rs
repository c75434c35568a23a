//! Built-in help for the gaussjob command-line tool
//!
//! Documents every key accepted in the parameters and settings dictionaries
//! and the available commands.

/// Dictionary a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Keys of the `parameters` dictionary
    Parameters,
    /// Keys of the `settings` dictionary
    Settings,
}

/// Documentation entry for a single dictionary key.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// The name of the key (e.g., "functional")
    pub name: &'static str,
    /// Dictionary the key belongs to
    pub category: KeywordCategory,
    /// What the key does
    pub description: &'static str,
    /// Value used when the key is absent
    pub default_value: Option<&'static str>,
    /// JSON snippet showing the key in use
    pub example: Option<&'static str>,
    /// Whether the key must be supplied
    pub required: bool,
}

/// All keyword documentation
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "functional",
        category: KeywordCategory::Parameters,
        description: "Functional or method written before the slash in the route line",
        default_value: None,
        example: Some("\"functional\": \"PBE1PBE\""),
        required: true,
    },
    Keyword {
        name: "basis_set",
        category: KeywordCategory::Parameters,
        description: "Basis set written after the slash in the route line",
        default_value: None,
        example: Some("\"basis_set\": \"6-31g\""),
        required: true,
    },
    Keyword {
        name: "route_parameters",
        category: KeywordCategory::Parameters,
        description: "Route keywords; null values give bare keywords, objects give options",
        default_value: Some("{}"),
        example: Some("\"route_parameters\": {\"nosymm\": null, \"opt\": {\"maxcycles\": 50}}"),
        required: false,
    },
    Keyword {
        name: "link0_parameters",
        category: KeywordCategory::Parameters,
        description: "Link 0 commands, one per line before the route",
        default_value: Some("{}"),
        example: Some("\"link0_parameters\": {\"%chk\": \"aiida.chk\", \"%mem\": \"1024MB\"}"),
        required: false,
    },
    Keyword {
        name: "input_parameters",
        category: KeywordCategory::Parameters,
        description: "Lines written after the molecule, e.g. a Gen basis or ModRedundant block",
        default_value: Some("{}"),
        example: Some("\"input_parameters\": {\"B 1 2 F\": null}"),
        required: false,
    },
    Keyword {
        name: "cmdline",
        category: KeywordCategory::Settings,
        description: "Command-line arguments passed to the Gaussian executable",
        default_value: Some("[]"),
        example: Some("\"cmdline\": [\"-p=4\"]"),
        required: false,
    },
    Keyword {
        name: "additional_retrieve_list",
        category: KeywordCategory::Settings,
        description: "Extra files fetched back after the run, besides aiida.log",
        default_value: Some("[]"),
        example: Some("\"additional_retrieve_list\": [\"aiida.chk\"]"),
        required: false,
    },
];

/// Print global help
pub fn print_global_help() {
    println!("gaussjob - Gaussian input and job descriptor generator");
    println!();
    println!("USAGE:");
    println!("    gaussjob [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    prepare <structure.xyz> <parameters.json> [--settings FILE] [--folder DIR] [--code-uuid UUID]");
    println!("                        Write aiida.gjf and calcinfo.json into the folder");
    println!("                        (default folder: ./sandbox)");
    println!();
    println!("    define");
    println!("                        Print the input/output schema as JSON");
    println!();
    println!("    check <retrieved_dir> <calcinfo.json>");
    println!("                        Verify the retrieved files; exits with status 100");
    println!("                        when any expected output is missing");
    println!();
    println!("    ci parameters.json");
    println!("                        Create a parameters template");
    println!();
    println!("    ci settings.json");
    println!("                        Create a settings dictionary template");
    println!();
    println!("    ci gaussjob_config.cfg");
    println!("                        Create a configuration template file");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords");
    println!();
    println!("CONFIGURATION FILE:");
    println!("    Supported locations:");
    println!("      - ./gaussjob_config.cfg (local, highest priority)");
    println!("      - ~/.config/gaussjob/gaussjob_config.cfg (user)");
    println!("      - /etc/gaussjob/gaussjob_config.cfg (system)");
    println!();
    println!("EXAMPLES:");
    println!("    gaussjob ci parameters.json");
    println!("    gaussjob prepare water.xyz parameters.json --folder water_sp");
    println!("    gaussjob check water_sp/retrieved water_sp/calcinfo.json");
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("KEYWORD REFERENCE");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();

    for category in [KeywordCategory::Parameters, KeywordCategory::Settings] {
        print_category_header(category);
        println!();
        for keyword in keywords_in(category) {
            print_keyword(keyword);
            println!();
        }
    }
}

/// Keywords of one dictionary, in declaration order.
pub fn keywords_in(category: KeywordCategory) -> Vec<&'static Keyword> {
    KEYWORDS.iter().filter(|k| k.category == category).collect()
}

fn print_category_header(category: KeywordCategory) {
    match category {
        KeywordCategory::Parameters => println!("PARAMETERS DICTIONARY"),
        KeywordCategory::Settings => println!("SETTINGS DICTIONARY"),
    }
    println!("{}", "─".repeat(76));
}

fn print_keyword(keyword: &Keyword) {
    let required_str = if keyword.required { " [REQUIRED]" } else { "" };

    println!("{}{}", keyword.name, required_str);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}
