use trailbuster::browser::HtmlPage;
use trailbuster::domain::{ContentKind, Link, NO_DESCRIPTION};
use trailbuster::parser::{ContentParser, UNKNOWN_TRAIL};

const MODULE_URL: &str = "https://trailhead.salesforce.com/content/learn/modules/apex_basics";

fn parser() -> ContentParser {
    ContentParser::default()
}

#[tokio::test]
async fn test_lesson_objectives_come_from_the_container_in_order() {
    let page = HtmlPage::from_html(
        "https://trailhead.salesforce.com/content/learn/modules/apex_basics/intro",
        r#"<html><body>
            <h1>Get Started with Apex</h1>
            <div class="learning-objectives"><ul>
              <li>Describe the Apex language</li>
              <li>Write a simple class</li>
              <li>Run code in the console</li>
              <li>Ok</li>
            </ul></div>
        </body></html>"#,
    );

    let lesson = parser().parse_lesson(&page).await.unwrap();
    assert_eq!(lesson.title, "Get Started with Apex");
    assert_eq!(
        lesson.learning_objectives,
        vec![
            "Describe the Apex language",
            "Write a simple class",
            "Run code in the console"
        ]
    );
}

#[tokio::test]
async fn test_lesson_text_fallbacks_apply_without_containers() {
    let page = HtmlPage::from_html(
        "https://trailhead.salesforce.com/content/learn/modules/apex_basics/intro",
        r#"<html><body>
            <h1>Lesson</h1>
            <p>You'll learn to write triggers. This takes about 15 minutes.</p>
            <p>Follow along: 1. Open the Developer Console. 2. Create a class.</p>
        </body></html>"#,
    );

    let lesson = parser().parse_lesson(&page).await.unwrap();
    assert_eq!(lesson.learning_objectives, vec!["You'll learn to write triggers."]);
    assert_eq!(
        lesson.instructions,
        vec!["1. Open the Developer Console.", "2. Create a class."]
    );
    assert_eq!(lesson.estimated_time.as_deref(), Some("15 minutes"));
}

#[tokio::test]
async fn test_duplicate_links_collapse_in_order() {
    let page = HtmlPage::from_html(
        "https://trailhead.salesforce.com/content/learn/modules/apex_basics/intro",
        r#"<html><body>
            <h1>Lesson</h1>
            <a href="/help/apex">Apex Guide</a>
            <a href="https://developer.salesforce.com/docs">Developer Docs</a>
            <a href="/help/apex">Apex Guide</a>
            <a href="https://unrelated.example/">Elsewhere</a>
            <a href="/x">Go</a>
            <a href="/hidden" style="display:none">Hidden Link</a>
        </body></html>"#,
    );

    let lesson = parser().parse_lesson(&page).await.unwrap();
    assert_eq!(
        lesson.links,
        vec![
            Link {
                text: "Apex Guide".into(),
                url: "https://trailhead.salesforce.com/help/apex".into(),
            },
            Link {
                text: "Developer Docs".into(),
                url: "https://developer.salesforce.com/docs".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_lesson_content_is_scoped_to_the_main_container() {
    let page = HtmlPage::from_html(
        "https://trailhead.salesforce.com/content/learn/modules/apex_basics/intro",
        r#"<html><body>
            <nav><p>Navigation text outside the lesson body</p></nav>
            <div class="lesson-content">
              <h2>Create a Class</h2>
              <p>Classes hold your business logic.</p>
              <div class="code-block">public class Hello {}</div>
            </div>
        </body></html>"#,
    );

    let lesson = parser().parse_lesson(&page).await.unwrap();
    let kinds: Vec<_> = lesson.content.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ContentKind::Heading, ContentKind::Paragraph, ContentKind::Code]);
    assert_eq!(lesson.content[2].text, "public class Hello {}");
}

#[tokio::test]
async fn test_module_lessons_skip_duplicates_and_status_links() {
    let page = HtmlPage::from_html(
        MODULE_URL,
        r#"<html><body>
            <h1>Apex Basics</h1>
            <div class="module-description">Too short</div>
            <span class="difficulty">Beginner</span>
            <ul>
              <li><a class="lesson-link" href="/content/learn/modules/apex_basics/intro">Get Started</a></li>
              <li><a class="lesson-link" href="/content/learn/modules/apex_basics/classes">Classes</a></li>
              <li><a class="lesson-link" href="/content/learn/modules/apex_basics/intro">Get Started</a></li>
              <li><a class="lesson-link" href="/content/learn/modules/apex_basics/triggers">Triggers</a></li>
              <li><a class="lesson-link" href="/content/learn/modules/apex_basics/intro">Start</a></li>
            </ul>
            <div class="prerequisites"><ul><li>A Developer Edition org</li></ul></div>
        </body></html>"#,
    );

    let module = parser().parse_module(&page).await.unwrap();
    assert_eq!(module.title, "Apex Basics");
    assert_eq!(module.description, NO_DESCRIPTION);
    assert_eq!(module.difficulty.as_deref(), Some("Beginner"));
    assert_eq!(module.prerequisites, vec!["A Developer Edition org"]);

    let titles: Vec<_> = module.lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Get Started", "Classes", "Triggers"]);
    assert_eq!(
        module.lessons[1].url,
        "https://trailhead.salesforce.com/content/learn/modules/apex_basics/classes"
    );
}

#[tokio::test]
async fn test_module_description_and_time_fallback() {
    let page = HtmlPage::from_html(
        MODULE_URL,
        r#"<html><body>
            <h1>Apex Basics</h1>
            <div class="module-description">Learn how to write and run Apex code on the platform.</div>
            <p>~1 hr 20 mins</p>
        </body></html>"#,
    );

    let module = parser().parse_module(&page).await.unwrap();
    assert_eq!(
        module.description,
        "Learn how to write and run Apex code on the platform."
    );
    assert_eq!(module.estimated_time.as_deref(), Some("~1 hr 20 mins"));
    assert!(module.lessons.is_empty());
    assert!(module.difficulty.is_none());
}

#[tokio::test]
async fn test_trail_lists_module_cards() {
    let page = HtmlPage::from_html(
        "https://trailhead.salesforce.com/content/learn/trails/force_com_dev_beginner",
        r#"<html><body>
            <h1 class="trail-title">Developer Beginner</h1>
            <p class="trail-description">Start building apps on the platform.</p>
            <div class="module-card"><a href="/content/learn/modules/apex_basics">Apex Basics</a></div>
            <div class="module-card"><a href="/content/learn/projects/quickstart">Project</a></div>
            <div class="module-card"><a href="/content/learn/modules/apex_basics">Apex Basics</a></div>
            <div class="module-card"><a href="/content/learn/modules/lex_dev">LEX</a></div>
        </body></html>"#,
    );

    let (trail, modules) = parser().parse_trail(&page).await.unwrap();
    assert_eq!(trail.title, "Developer Beginner");
    assert_eq!(trail.description, "Start building apps on the platform.");
    assert_eq!(
        modules,
        vec![
            "https://trailhead.salesforce.com/content/learn/modules/apex_basics",
            "https://trailhead.salesforce.com/content/learn/modules/lex_dev",
        ]
    );
}

#[tokio::test]
async fn test_trail_defaults_when_nothing_matches() {
    let page = HtmlPage::from_html("https://a.example/trails/empty", "<html><body></body></html>");
    let (trail, modules) = parser().parse_trail(&page).await.unwrap();
    assert_eq!(trail.title, UNKNOWN_TRAIL);
    assert_eq!(trail.description, NO_DESCRIPTION);
    assert_eq!(trail.url, "https://a.example/trails/empty");
    assert!(modules.is_empty());
}
